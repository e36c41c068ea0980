//! In-process transport and fixtures shared by the integration suites.

#![allow(dead_code)]

// std
use std::{future::Future, sync::Arc};
// crates.io
use parking_lot::Mutex;
use serde_json::Value;
// self
use storefront_client::{
	auth::TokenPair,
	client::ApiClient,
	config::ClientConfig,
	error::TransportError,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	http_types::{Method, StatusCode, header},
	store::MemoryStore,
};

pub const BASE_URL: &str = "https://shop.test";

/// What the transport saw for one call.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
	pub method: Method,
	pub path: String,
	pub authorization: Option<String>,
	pub content_type: Option<String>,
	pub body: Vec<u8>,
}
impl RecordedRequest {
	fn capture(request: &HttpRequest) -> Self {
		let read = |name: header::HeaderName| {
			request.headers().get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
		};

		Self {
			method: request.method().clone(),
			path: request
				.uri()
				.path_and_query()
				.map(|path| path.as_str().to_owned())
				.unwrap_or_default(),
			authorization: read(header::AUTHORIZATION),
			content_type: read(header::CONTENT_TYPE),
			body: request.body().clone(),
		}
	}

	pub fn bearer(&self) -> Option<&str> {
		self.authorization.as_deref().and_then(|value| value.strip_prefix("Bearer "))
	}

	pub fn json(&self) -> Value {
		serde_json::from_slice(&self.body).expect("Recorded body should be JSON.")
	}
}

type Handler = Box<dyn Fn(RecordedRequest) -> TransportFuture<'static> + Send + Sync>;

/// Transport answering every call through a scripted handler.
pub struct ScriptedTransport {
	handler: Handler,
	recorded: Mutex<Vec<RecordedRequest>>,
}
impl ScriptedTransport {
	pub fn new<F, Fut>(handler: F) -> Arc<Self>
	where
		F: 'static + Fn(RecordedRequest) -> Fut + Send + Sync,
		Fut: 'static + Future<Output = Result<HttpResponse, TransportError>> + Send,
	{
		let handler: Handler =
			Box::new(move |request| -> TransportFuture<'static> { Box::pin(handler(request)) });

		Arc::new(Self { handler, recorded: Mutex::new(Vec::new()) })
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.recorded.lock().clone()
	}

	pub fn calls_to(&self, path: &str) -> Vec<RecordedRequest> {
		self.requests().into_iter().filter(|request| request.path == path).collect()
	}
}
impl HttpTransport for ScriptedTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let recorded = RecordedRequest::capture(&request);

		self.recorded.lock().push(recorded.clone());

		(self.handler)(recorded)
	}
}

pub fn json_response(status: u16, body: Value) -> HttpResponse {
	let mut response = HttpResponse::new(
		serde_json::to_vec(&body).expect("Fixture body should serialize."),
	);

	*response.status_mut() = StatusCode::from_u16(status).expect("Fixture status should be valid.");
	response.headers_mut().insert(
		header::CONTENT_TYPE,
		header::HeaderValue::from_static("application/json"),
	);

	response
}

pub fn empty_response(status: u16) -> HttpResponse {
	let mut response = HttpResponse::new(Vec::new());

	*response.status_mut() = StatusCode::from_u16(status).expect("Fixture status should be valid.");

	response
}

pub fn client(
	transport: Arc<ScriptedTransport>,
) -> (ApiClient<ScriptedTransport>, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());
	let config = ClientConfig::new(BASE_URL).expect("Fixture base URL should parse.");

	(ApiClient::with_transport(config, store.clone(), transport), store)
}

pub async fn signed_in(
	transport: Arc<ScriptedTransport>,
	access: &str,
	refresh: &str,
) -> (ApiClient<ScriptedTransport>, Arc<MemoryStore>) {
	let (client, store) = client(transport);

	client
		.store_session(&TokenPair::new(access, refresh))
		.await
		.expect("Seeding the session should succeed.");

	(client, store)
}
