//! Account session operations built on [`ApiClient`].
//!
//! Sign-in and sign-up are the only calls besides a refresh that write the stored session;
//! sign-out always clears it.

// crates.io
use serde::{Deserializer, de::IgnoredAny};
// self
use crate::{
	_prelude::*,
	auth::TokenPair,
	client::ApiClient,
	http::HttpTransport,
	obs,
	request::{Access, RequestOptions},
};

/// Public sign-in endpoint.
pub const SIGN_IN_PATH: &str = "/auth/login";
/// Public registration endpoint.
pub const SIGN_UP_PATH: &str = "/auth/register";
/// Protected sign-out endpoint.
pub const SIGN_OUT_PATH: &str = "/auth/logout";
/// Protected profile endpoint.
pub const PROFILE_PATH: &str = "/users/me";
/// Protected password change endpoint.
pub const CHANGE_PASSWORD_PATH: &str = "/auth/change-password";

/// Storefront customer profile.
///
/// Missing or `null` fields read as empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	/// Sign-in email.
	#[serde(default, deserialize_with = "string_or_empty")]
	pub email: String,
	/// Contact phone.
	#[serde(default, deserialize_with = "string_or_empty")]
	pub phone: String,
	/// Given name.
	#[serde(default, deserialize_with = "string_or_empty")]
	pub first_name: String,
	/// Family name.
	#[serde(default, deserialize_with = "string_or_empty")]
	pub last_name: String,
	/// Avatar URL.
	#[serde(default, deserialize_with = "string_or_empty")]
	pub avatar: String,
}

/// Profile fields to change; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProfile {
	/// New given name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub first_name: Option<String>,
	/// New family name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_name: Option<String>,
	/// New email.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// New phone.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
	email: &'a str,
	password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Registration<'a> {
	email: &'a str,
	password: &'a str,
	first_name: &'a str,
	last_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChange<'a> {
	current_password: &'a str,
	new_password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionGrant {
	#[serde(flatten)]
	tokens: TokenPair,
	#[serde(default)]
	user: User,
}

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Signs in and stores the issued session.
	pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
		let options = RequestOptions::post().json(&Credentials { email, password })?;

		self.open_session(SIGN_IN_PATH, options).await
	}

	/// Registers an account with blank names and stores the issued session.
	pub async fn sign_up(&self, email: &str, password: &str) -> Result<User> {
		let options = RequestOptions::post().json(&Registration {
			email,
			password,
			first_name: "",
			last_name: "",
		})?;

		self.open_session(SIGN_UP_PATH, options).await
	}

	/// Notifies the backend and clears the stored session.
	///
	/// A failed logout call is logged and otherwise ignored; only a storage failure while
	/// clearing surfaces as an error.
	pub async fn sign_out(&self) -> Result<()> {
		if let Err(e) =
			self.request::<IgnoredAny>(SIGN_OUT_PATH, RequestOptions::post(), Access::Protected).await
		{
			obs::warn_event!("Logout call failed: {e}.");
		}

		self.clear_session().await
	}

	/// Updates the signed-in customer's profile.
	pub async fn edit_profile(&self, changes: &EditProfile) -> Result<User> {
		let options = RequestOptions::patch().json(changes)?;
		let user = self.request(PROFILE_PATH, options, Access::Protected).await?;

		required(PROFILE_PATH, user)
	}

	/// Changes the signed-in customer's password.
	pub async fn change_password(&self, current: &str, new: &str) -> Result<()> {
		let options = RequestOptions::post()
			.json(&PasswordChange { current_password: current, new_password: new })?;

		self.request::<IgnoredAny>(CHANGE_PASSWORD_PATH, options, Access::Protected).await?;

		Ok(())
	}

	async fn open_session(&self, path: &str, options: RequestOptions) -> Result<User> {
		let grant = required::<SessionGrant>(path, self.public_request(path, options).await?)?;

		self.store_session(&grant.tokens).await?;

		Ok(grant.user)
	}
}

// A 204 where a payload is required decodes as `null`, which no payload type accepts.
fn required<R>(path: &str, value: Option<R>) -> Result<R>
where
	R: DeserializeOwned,
{
	match value {
		Some(value) => Ok(value),
		None => ApiClient::<dyn HttpTransport>::decode(path, b"null"),
	}
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
