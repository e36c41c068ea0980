//! Access/refresh token pair persisted between sessions.

// crates.io
use serde::Deserializer;
// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Access and refresh tokens issued by sign-in, sign-up, or refresh.
///
/// The serialized form matches the backend's camelCase payload so the same type reads the
/// refresh endpoint's response and the persisted storage entry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
	/// Bearer credential attached to protected requests.
	pub access_token: TokenSecret,
	/// Credential exchanged for a new pair once the access token is rejected.
	///
	/// A missing or `null` value reads as blank, which disables refreshing.
	#[serde(default, deserialize_with = "secret_or_blank")]
	pub refresh_token: TokenSecret,
}
impl TokenPair {
	/// Builds a pair from raw token strings.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
		}
	}

	/// Returns the refresh token unless it is blank.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		(!self.refresh_token.is_empty()).then_some(&self.refresh_token)
	}

	/// Returns the access token unless it is blank.
	pub fn access_token(&self) -> Option<&TokenSecret> {
		(!self.access_token.is_empty()).then_some(&self.access_token)
	}
}
impl Debug for TokenPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenPair")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token().map(|_| "<redacted>"))
			.finish()
	}
}

/// Token payload returned by the refresh endpoint; the refresh token may be omitted when the
/// backend does not rotate it.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshedTokens {
	pub access_token: TokenSecret,
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
}
impl RefreshedTokens {
	/// Merges the response with the refresh token that was exchanged.
	pub fn into_pair(self, previous_refresh: &TokenSecret) -> TokenPair {
		TokenPair {
			access_token: self.access_token,
			refresh_token: self
				.refresh_token
				.filter(|secret| !secret.is_empty())
				.unwrap_or_else(|| previous_refresh.clone()),
		}
	}
}

fn secret_or_blank<'de, D>(deserializer: D) -> Result<TokenSecret, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<TokenSecret>::deserialize(deserializer)?.unwrap_or_default())
}
