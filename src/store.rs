//! Storage contracts, the typed token store, and built-in key-value backends.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::TokenPair, obs};

/// Storage key under which the session's [`TokenPair`] is persisted by default.
pub const DEFAULT_TOKEN_KEY: &str = "auth_tokens";

/// Boxed future returned by [`KeyValueStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Minimal string key-value contract the client persists session state through.
pub trait KeyValueStore
where
	Self: Send + Sync,
{
	/// Fetches the value stored under `key`, if present.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores or replaces the value under `key`.
	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Removes the value under `key`; removing a missing key is not an error.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`KeyValueStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Typed access to the persisted [`TokenPair`].
///
/// Absent and malformed entries both read as "no session"; only backend failures surface as
/// errors.
#[derive(Clone)]
pub struct TokenStore {
	backend: Arc<dyn KeyValueStore>,
	key: String,
}
impl TokenStore {
	/// Wraps a backend, persisting the pair under `key`.
	pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
		Self { backend, key: key.into() }
	}

	/// Returns the storage key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Loads the current pair.
	pub async fn load(&self) -> Result<Option<TokenPair>, StoreError> {
		let Some(raw) = self.backend.get(&self.key).await? else {
			return Ok(None);
		};

		match serde_json::from_str::<TokenPair>(&raw) {
			Ok(pair) => Ok(Some(pair)),
			Err(e) => {
				obs::warn_event!("Ignoring malformed token entry `{}`: {e}.", self.key);

				Ok(None)
			},
		}
	}

	/// Persists `pair`, replacing any previous session.
	pub async fn save(&self, pair: &TokenPair) -> Result<(), StoreError> {
		let raw = serde_json::to_string(pair)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

		self.backend.set(&self.key, raw).await
	}

	/// Removes the persisted pair.
	pub async fn clear(&self) -> Result<(), StoreError> {
		self.backend.remove(&self.key).await
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore").field("key", &self.key).finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::error::Error;
	use std::error::Error as StdError;

	fn token_store() -> (TokenStore, Arc<MemoryStore>) {
		let backend = Arc::new(MemoryStore::default());

		(TokenStore::new(backend.clone(), DEFAULT_TOKEN_KEY), backend)
	}

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("disk unavailable"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn token_store_round_trips_and_clears() {
		let (tokens, backend) = token_store();
		let rt = Runtime::new().expect("Failed to build Tokio runtime for token store test.");

		rt.block_on(tokens.save(&TokenPair::new("A1", "R1"))).expect("Saving pair should succeed.");

		let raw = rt
			.block_on(backend.get(DEFAULT_TOKEN_KEY))
			.expect("Raw fetch should succeed.")
			.expect("Raw entry should exist after save.");

		assert_eq!(raw, r#"{"accessToken":"A1","refreshToken":"R1"}"#);
		assert_eq!(
			rt.block_on(tokens.load()).expect("Loading pair should succeed."),
			Some(TokenPair::new("A1", "R1")),
		);

		rt.block_on(tokens.clear()).expect("Clearing pair should succeed.");

		assert_eq!(rt.block_on(tokens.load()).expect("Loading after clear should succeed."), None);
	}

	#[test]
	fn malformed_entries_read_as_no_session() {
		let (tokens, backend) = token_store();
		let rt = Runtime::new().expect("Failed to build Tokio runtime for token store test.");

		rt.block_on(backend.set(DEFAULT_TOKEN_KEY, "{not json".into()))
			.expect("Seeding malformed entry should succeed.");

		assert_eq!(rt.block_on(tokens.load()).expect("Malformed entries must not error."), None);

		rt.block_on(backend.set(DEFAULT_TOKEN_KEY, r#"{"refreshToken":"R1"}"#.into()))
			.expect("Seeding entry without access token should succeed.");

		assert_eq!(rt.block_on(tokens.load()).expect("Partial entries must not error."), None);
	}

	#[test]
	fn access_only_entries_load_without_refresh_token() {
		let (tokens, backend) = token_store();
		let rt = Runtime::new().expect("Failed to build Tokio runtime for token store test.");

		rt.block_on(backend.set(DEFAULT_TOKEN_KEY, r#"{"accessToken":"A1"}"#.into()))
			.expect("Seeding access-only entry should succeed.");

		let pair = rt
			.block_on(tokens.load())
			.expect("Access-only entries must not error.")
			.expect("Access-only entries are a session.");

		assert_eq!(pair, TokenPair::new("A1", ""));
		assert!(pair.refresh_token().is_none());
	}
}
