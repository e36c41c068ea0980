//! Signs in against a mock storefront, then makes a protected call that outlives its access
//! token: the client refreshes the session once and retries the call.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::Value;
// self
use storefront_client::{
	client::ReqwestApiClient,
	config::ClientConfig,
	request::{Access, RequestOptions},
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/login");
			then.status(200).header("content-type", "application/json").body(
				"{\"accessToken\":\"demo-access-1\",\"refreshToken\":\"demo-refresh-1\",\"user\":{\"email\":\"demo@example.com\",\"firstName\":\"Demo\"}}",
			);
		})
		.await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/orders").header("authorization", "Bearer demo-access-1");
			then.status(401).body("{\"message\":\"Token expired\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"demo-access-2\",\"refreshToken\":\"demo-refresh-2\"}");
		})
		.await;
	let orders = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/orders").header("authorization", "Bearer demo-access-2");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"data\":[{\"id\":1,\"orderNumber\":\"SO-1001\"}]}");
		})
		.await;
	let config = ClientConfig::new(server.url("/api/v1"))?;
	let client = ReqwestApiClient::new(config, Arc::new(MemoryStore::default()));
	let user = client.sign_in("demo@example.com", "demo-password").await?;

	println!("Signed in as {} <{}>.", user.first_name, user.email);

	let page = client.request::<Value>("/orders", RequestOptions::get(), Access::Protected).await?;

	println!("Orders: {}", page.unwrap_or_default());
	println!("Refresh cycles: {}", client.refresh_coordinator().metrics.cycles());

	login.assert_async().await;
	expired.assert_async().await;
	refresh.assert_async().await;
	orders.assert_async().await;

	Ok(())
}
