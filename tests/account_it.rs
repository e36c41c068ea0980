mod support;

// crates.io
use color_eyre::Result;
use serde_json::json;
// self
use storefront_client::{account::EditProfile, auth::TokenPair, http_types::Method};
use support::*;

#[tokio::test]
async fn edit_profile_patches_only_changed_fields() -> Result<()> {
	let transport = ScriptedTransport::new(|_| async {
		Ok(json_response(
			200,
			json!({ "email": "ada@example.com", "phone": "+44 20 7946", "firstName": "Ada", "lastName": null }),
		))
	});
	let (client, _) = signed_in(transport.clone(), "A1", "R1").await;
	let changes = EditProfile { phone: Some("+44 20 7946".into()), ..Default::default() };
	let user = client.edit_profile(&changes).await?;
	let requests = transport.requests();
	let call = &requests[0];

	assert_eq!(call.method, Method::PATCH);
	assert_eq!(call.path, "/users/me");
	assert_eq!(call.bearer(), Some("A1"));
	assert_eq!(call.json(), json!({ "phone": "+44 20 7946" }));
	assert_eq!(user.phone, "+44 20 7946");
	assert_eq!(user.last_name, "");

	Ok(())
}

#[tokio::test]
async fn change_password_accepts_an_empty_reply() -> Result<()> {
	let transport = ScriptedTransport::new(|_| async { Ok(empty_response(204)) });
	let (client, _) = signed_in(transport.clone(), "A1", "R1").await;

	client.change_password("old-pass", "new-pass").await?;

	let requests = transport.requests();
	let call = &requests[0];

	assert_eq!(call.path, "/auth/change-password");
	assert_eq!(call.json(), json!({ "currentPassword": "old-pass", "newPassword": "new-pass" }));

	Ok(())
}

#[tokio::test]
async fn account_calls_recover_from_an_expired_token() -> Result<()> {
	let transport = ScriptedTransport::new(|request| async move {
		Ok(match (request.path.as_str(), request.bearer()) {
			("/auth/refresh", _) =>
				json_response(200, json!({ "accessToken": "A2", "refreshToken": "R2" })),
			(_, Some("A2")) => json_response(200, json!({ "email": "ada@example.com" })),
			_ => json_response(401, json!({ "message": "Token expired" })),
		})
	});
	let (client, _) = signed_in(transport.clone(), "A1", "R1").await;
	let user = client.edit_profile(&EditProfile::default()).await?;

	assert_eq!(user.email, "ada@example.com");
	assert_eq!(client.session().await?, Some(TokenPair::new("A2", "R2")));
	assert_eq!(transport.calls_to("/users/me").len(), 2);

	Ok(())
}

#[tokio::test]
async fn sign_out_clears_the_session_even_when_offline() -> Result<()> {
	let transport = ScriptedTransport::new(|_| async {
		Err(storefront_client::error::TransportError::Io(std::io::Error::other("offline")))
	});
	let (client, store) = signed_in(transport.clone(), "A1", "R1").await;

	client.sign_out().await?;

	assert!(store.is_empty());
	assert_eq!(transport.requests()[0].path, "/auth/logout");

	Ok(())
}
