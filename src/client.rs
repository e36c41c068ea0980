//! The authenticated request client.
//!
//! [`ApiClient::request`] sends a call to `{base_url}{path}`, attaching the stored access token
//! to protected calls. A 401 on a protected call whose session holds a refresh token joins the
//! shared [`RefreshCoordinator`] and, when a token comes back, retries the call exactly once.
//! Failures are normalized into [`Error::Api`] (any non-success status that survives the retry)
//! and [`Error::SessionExpired`] (refresh impossible or rejected).

pub mod refresh;

pub use refresh::*;

// crates.io
use ::http::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
	config::ClientConfig,
	error::ApiError,
	http::{self, HttpResponse, HttpTransport},
	obs::{self, RequestOutcome, RequestSpan},
	request::{Access, OutboundRequest, RequestOptions},
	store::{KeyValueStore, TokenStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Authenticated client for the storefront REST API.
///
/// The client owns the transport, configuration, token store, and refresh coordinator so
/// callers only describe the call. Cloning is cheap and clones share every component, including
/// the single-flight refresh state.
pub struct ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound call.
	pub transport: Arc<T>,
	/// Endpoint and storage settings.
	pub config: ClientConfig,
	tokens: TokenStore,
	refresh: Arc<RefreshCoordinator>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn KeyValueStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let tokens = TokenStore::new(store, config.token_key.clone());

		Self { transport: transport.into(), config, tokens, refresh: Default::default() }
	}

	/// Replaces the refresh coordinator, letting several clients over one session share a
	/// single in-flight refresh.
	pub fn with_refresh_coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
		self.refresh = coordinator;

		self
	}

	/// Returns the refresh coordinator.
	pub fn refresh_coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.refresh
	}

	/// Returns the typed token store.
	pub fn token_store(&self) -> &TokenStore {
		&self.tokens
	}

	/// Returns the stored session, if any.
	pub async fn session(&self) -> Result<Option<TokenPair>> {
		Ok(self.tokens.load().await?)
	}

	/// Persists a pair issued by sign-in or sign-up.
	pub async fn store_session(&self, pair: &TokenPair) -> Result<()> {
		Ok(self.tokens.save(pair).await?)
	}

	/// Forgets the stored session.
	pub async fn clear_session(&self) -> Result<()> {
		Ok(self.tokens.clear().await?)
	}

	/// Performs a call and decodes its JSON body.
	///
	/// Returns `Ok(None)` for `204 No Content`. Protected calls refresh and retry once on 401
	/// when the session holds a refresh token; public calls never carry credentials.
	pub async fn request<R>(
		&self,
		path: &str,
		options: RequestOptions,
		access: Access,
	) -> Result<Option<R>>
	where
		R: DeserializeOwned,
	{
		let kind = access.kind();
		let span = RequestSpan::new(kind, "request");

		obs::record_request_outcome(kind, RequestOutcome::Attempt);

		let result = span.instrument(self.dispatch(OutboundRequest::new(path, options, access))).await;

		match &result {
			Ok(_) => obs::record_request_outcome(kind, RequestOutcome::Success),
			Err(_) => obs::record_request_outcome(kind, RequestOutcome::Failure),
		}

		result
	}

	/// Performs an unauthenticated call; see [`ApiClient::request`].
	pub async fn public_request<R>(&self, path: &str, options: RequestOptions) -> Result<Option<R>>
	where
		R: DeserializeOwned,
	{
		self.request(path, options, Access::Public).await
	}

	async fn dispatch<R>(&self, request: OutboundRequest) -> Result<Option<R>>
	where
		R: DeserializeOwned,
	{
		let session = match request.access {
			Access::Protected => self.tokens.load().await?,
			Access::Public => None,
		};
		let bearer = session.as_ref().and_then(TokenPair::access_token);
		let mut response = self.execute(&request, bearer).await?;

		if response.status() == StatusCode::UNAUTHORIZED
			&& let Some(session) = session.as_ref().filter(|pair| pair.refresh_token().is_some())
		{
			let rejected = session.access_token.clone();
			let token = self.refreshed_access_token(&rejected).await.ok_or(Error::SessionExpired)?;

			response = self.execute(&request, Some(&token)).await?;
		}

		Self::finish(&request.path, response)
	}

	pub(crate) async fn execute(
		&self,
		request: &OutboundRequest,
		bearer: Option<&TokenSecret>,
	) -> Result<HttpResponse> {
		let wire = request.to_http(&self.config, bearer)?;

		Ok(self.transport.execute(wire).await?)
	}

	pub(crate) fn ensure_success(path: &str, response: HttpResponse) -> Result<HttpResponse> {
		let status = response.status();

		if status.is_success() {
			return Ok(response);
		}

		let retry_after = http::parse_retry_after(response.headers());

		Err(ApiError::from_response(status.as_u16(), path, response.body())
			.with_retry_after(retry_after)
			.into())
	}

	pub(crate) fn decode<R>(path: &str, body: &[u8]) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { path: path.to_owned(), source })
	}

	fn finish<R>(path: &str, response: HttpResponse) -> Result<Option<R>>
	where
		R: DeserializeOwned,
	{
		let response = Self::ensure_success(path, response)?;

		if response.status() == StatusCode::NO_CONTENT {
			return Ok(None);
		}

		Self::decode(path, response.body()).map(Some)
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Self {
		Self::with_transport(config, store, ReqwestTransport::default())
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			tokens: self.tokens.clone(),
			refresh: self.refresh.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("config", &self.config)
			.field("refreshing", &self.refresh.is_refreshing())
			.finish()
	}
}
