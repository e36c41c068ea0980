//! Client-level error types shared across requests, refresh cycles, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Backend answered with a non-success status.
	#[error(transparent)]
	Api(#[from] ApiError),

	/// Successful response body could not be decoded into the requested type.
	#[error("Response body from `{path}` could not be decoded.")]
	Decode {
		/// Request path that produced the body.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The session could not be refreshed; stored tokens have been cleared.
	#[error("Session expired; sign in again.")]
	SessionExpired,
}
impl Error {
	/// Returns the HTTP status carried by [`Error::Api`], if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api(e) => Some(e.status),
			_ => None,
		}
	}

	/// Returns `true` when the caller should send the user back to sign-in.
	pub fn is_session_expired(&self) -> bool {
		matches!(self, Self::SessionExpired)
	}
}

/// Non-success response returned by the storefront backend.
#[derive(Clone, Debug, ThisError)]
#[error("API request to `{path}` failed with status {status}: {message}.")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Request path, relative to the configured base URL.
	pub path: String,
	/// Best-effort message extracted from the response body.
	pub message: String,
	/// Parsed response body, or an empty object when it was not JSON.
	pub body: Value,
	/// Retry-After hint from upstream, if supplied.
	pub retry_after: Option<Duration>,
}
impl ApiError {
	/// Builds an error from a failed response's status and raw body bytes.
	pub fn from_response(status: u16, path: impl Into<String>, body: &[u8]) -> Self {
		let body = serde_json::from_slice::<Value>(body)
			.unwrap_or_else(|_| Value::Object(Default::default()));
		let message = extract_message(&body).unwrap_or_else(|| format!("API error {status}"));

		Self { status, path: path.into(), message, body, retry_after: None }
	}

	/// Attaches a Retry-After hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// Base URL cannot be parsed.
	#[error("Base URL `{value}` is invalid.")]
	InvalidBaseUrl {
		/// Raw configured value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than http(s).
	#[error("Base URL `{value}` must use http or https.")]
	UnsupportedScheme {
		/// Raw configured value.
		value: String,
	},

	/// A request path does not form a valid URL with the base.
	#[error("Endpoint `{value}` is invalid.")]
	InvalidEndpoint {
		/// Joined base URL and path.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// No base URL is configured for a production profile.
	#[error("STOREFRONT_API_URL must be set in production.")]
	MissingBaseUrl,
	/// A header name or value supplied by the caller is malformed.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// Stored access token cannot be encoded as an HTTP header value.
	#[error("Access token cannot be sent as a bearer credential.")]
	InvalidCredential,
	/// Request payload could not be encoded as JSON.
	#[error("Request body could not be encoded as JSON.")]
	BodyEncode(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the storefront API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the storefront API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

// Validation-style backends return `message` as a list of strings.
fn extract_message(body: &Value) -> Option<String> {
	let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_owned());

	match body.get("message") {
		Some(Value::String(s)) =>
			if let Some(message) = non_empty(s.as_str()) {
				return Some(message);
			},
		Some(Value::Array(items)) if !items.is_empty() => {
			let parts = items
				.iter()
				.map(|item| match item {
					Value::String(s) => s.clone(),
					other => other.to_string(),
				})
				.collect::<Vec<_>>();

			return Some(parts.join(", "));
		},
		_ => {},
	}

	body.get("error").and_then(Value::as_str).and_then(non_empty)
}
