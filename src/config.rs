//! Client configuration resolved once at process start.

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError, store::DEFAULT_TOKEN_KEY};

/// Environment variable holding the API base URL.
pub const BASE_URL_VAR: &str = "STOREFRONT_API_URL";
/// Environment variable naming the deployment profile (`production` disables the fallback).
pub const PROFILE_VAR: &str = "STOREFRONT_ENV";
/// Base URL used outside production when [`BASE_URL_VAR`] is unset.
pub const DEVELOPMENT_BASE_URL: &str = "http://localhost:4045/api/v1";
/// Path of the token refresh endpoint, relative to the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Endpoint and storage settings for an [`ApiClient`](crate::client::ApiClient).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	base_url: String,
	/// Path POSTed to when the access token must be rotated.
	pub refresh_path: String,
	/// Storage key under which the session's token pair lives.
	pub token_key: String,
}
impl ClientConfig {
	/// Validates `base_url` and applies default refresh path + token key.
	///
	/// The base may carry a path prefix (for example `/api/v1`); request paths are appended to
	/// it verbatim.
	pub fn new(base_url: impl AsRef<str>) -> Result<Self, ConfigError> {
		let raw = base_url.as_ref().trim();
		let parsed = Url::parse(raw)
			.map_err(|source| ConfigError::InvalidBaseUrl { value: raw.to_owned(), source })?;

		if !matches!(parsed.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { value: raw.to_owned() });
		}

		Ok(Self {
			base_url: parsed.as_str().trim_end_matches('/').to_owned(),
			refresh_path: DEFAULT_REFRESH_PATH.into(),
			token_key: DEFAULT_TOKEN_KEY.into(),
		})
	}

	/// Resolves the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| env::var(key).ok())
	}

	/// Resolves the configuration through `lookup`, mirroring [`ClientConfig::from_env`].
	///
	/// Without [`BASE_URL_VAR`], development profiles fall back to [`DEVELOPMENT_BASE_URL`]
	/// while `production` fails with [`ConfigError::MissingBaseUrl`].
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let non_blank = |key| lookup(key).filter(|value: &String| !value.trim().is_empty());

		if let Some(url) = non_blank(BASE_URL_VAR) {
			return Self::new(url);
		}

		let production = non_blank(PROFILE_VAR)
			.is_some_and(|profile| profile.trim().eq_ignore_ascii_case("production"));

		if production {
			return Err(ConfigError::MissingBaseUrl);
		}

		crate::obs::warn_event!(
			"{BASE_URL_VAR} is not set; falling back to {DEVELOPMENT_BASE_URL}."
		);

		Self::new(DEVELOPMENT_BASE_URL)
	}

	/// Overrides the refresh endpoint path.
	pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the storage key of the persisted token pair.
	pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
		self.token_key = key.into();

		self
	}

	/// Returns the normalized base URL without a trailing slash.
	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// Joins `path` onto the base URL.
	pub fn endpoint(&self, path: &str) -> String {
		if path.is_empty() || path.starts_with('/') || path.starts_with('?') {
			format!("{}{path}", self.base_url)
		} else {
			format!("{}/{path}", self.base_url)
		}
	}

	/// Joins `path` onto the base URL and percent-encodes characters a URI cannot carry.
	pub fn endpoint_url(&self, path: &str) -> Result<Url, ConfigError> {
		let value = self.endpoint(path);

		Url::parse(&value).map_err(|source| ConfigError::InvalidEndpoint { value, source })
	}
}
