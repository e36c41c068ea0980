//! Transport primitives for storefront API calls.
//!
//! The module exposes [`HttpTransport`], the client's only dependency on an HTTP stack, along
//! with the reqwest-backed [`ReqwestTransport`]. Requests and responses are plain
//! [`::http`] values with fully buffered bodies so the client can re-send an identical request
//! after a token refresh and inspect failure bodies without streaming.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use ::http::{HeaderMap, header::RETRY_AFTER};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};

/// Buffered outbound request handed to a transport.
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Buffered response returned by a transport.
pub type HttpResponse = ::http::Response<Vec<u8>>;

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing storefront API calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// clone of a client, and the futures they return must be `Send` so requests can hop executor
/// threads. Any HTTP status, including 401 and 5xx, is a successful transport outcome; only
/// failures to obtain a response are errors.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and buffers the full response body.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Timeouts, proxies, and TLS roots are configured on the wrapped client; the request
/// pipeline itself never times out.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let request = reqwest::Request::try_from(request).map_err(TransportError::from)?;
			let response = client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut buffered = HttpResponse::new(response.bytes().await?.to_vec());

			*buffered.status_mut() = status;
			*buffered.headers_mut() = headers;

			Ok(buffered)
		})
	}
}

/// Parses a `Retry-After` header given either as delta seconds or an RFC 2822 date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
