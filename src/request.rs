//! Outbound request model: options, bodies, and the wire request built from them.

// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	error::ConfigError,
	http::HttpRequest,
	obs::RequestKind,
};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Whether a request carries the session's credentials.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Access {
	/// Bearer credential attached; 401 responses trigger a refresh.
	#[default]
	Protected,
	/// No credential attached and no refresh attempted.
	Public,
}
impl Access {
	/// Returns `true` for [`Access::Public`].
	pub const fn is_public(self) -> bool {
		matches!(self, Self::Public)
	}

	pub(crate) const fn kind(self) -> RequestKind {
		match self {
			Self::Protected => RequestKind::Protected,
			Self::Public => RequestKind::Public,
		}
	}
}

/// Request payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RequestBody {
	/// No payload.
	#[default]
	Empty,
	/// JSON-encoded payload.
	Json(Vec<u8>),
	/// Opaque multipart payload that carries its own content type.
	Multipart(MultipartBody),
}
impl RequestBody {
	fn content_type(&self) -> Option<&str> {
		match self {
			Self::Multipart(body) => Some(body.content_type()),
			_ => None,
		}
	}

	fn bytes(&self) -> Vec<u8> {
		match self {
			Self::Empty => Vec::new(),
			Self::Json(bytes) => bytes.clone(),
			Self::Multipart(body) => body.to_bytes(),
		}
	}
}

/// `multipart/form-data` payload assembled from text and file parts.
#[derive(Clone, PartialEq, Eq)]
pub struct MultipartBody {
	boundary: String,
	content_type: String,
	bytes: Vec<u8>,
}
impl MultipartBody {
	/// Starts an empty form with a random boundary.
	pub fn new() -> Self {
		let boundary = format!("storefront-{:032x}", rand::random::<u128>());

		Self {
			content_type: format!("multipart/form-data; boundary={boundary}"),
			boundary,
			bytes: Vec::new(),
		}
	}

	/// Appends a text field.
	pub fn text(self, name: &str, value: &str) -> Self {
		self.part(&format!("form-data; name=\"{}\"", escape_param(name)), None, value.as_bytes())
	}

	/// Appends a file field.
	///
	/// Quotes and line breaks in `name` or `filename` are percent-encoded, as browsers do.
	pub fn file(self, name: &str, filename: &str, content_type: &str, contents: &[u8]) -> Self {
		let disposition = format!(
			"form-data; name=\"{}\"; filename=\"{}\"",
			escape_param(name),
			escape_param(filename)
		);
		let content_type = content_type.replace(['\r', '\n'], "");

		self.part(&disposition, Some(&content_type), contents)
	}

	/// Returns the `Content-Type` header value including the boundary.
	pub fn content_type(&self) -> &str {
		&self.content_type
	}

	/// Returns the encoded body, including the closing boundary.
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut bytes = self.bytes.clone();

		bytes.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());

		bytes
	}

	fn part(mut self, disposition: &str, content_type: Option<&str>, contents: &[u8]) -> Self {
		let mut head = format!("--{}\r\nContent-Disposition: {disposition}\r\n", self.boundary);

		if let Some(content_type) = content_type {
			head.push_str(&format!("Content-Type: {content_type}\r\n"));
		}

		head.push_str("\r\n");
		self.bytes.extend_from_slice(head.as_bytes());
		self.bytes.extend_from_slice(contents);
		self.bytes.extend_from_slice(b"\r\n");

		self
	}
}
fn escape_param(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());

	for c in value.chars() {
		match c {
			'"' => escaped.push_str("%22"),
			'\r' => escaped.push_str("%0D"),
			'\n' => escaped.push_str("%0A"),
			c => escaped.push(c),
		}
	}

	escaped
}

impl Default for MultipartBody {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for MultipartBody {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MultipartBody")
			.field("content_type", &self.content_type)
			.field("len", &self.bytes.len())
			.finish()
	}
}

/// Method, headers, and body of a client call.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
	/// HTTP method; defaults to `GET`.
	pub method: Method,
	/// Caller headers; they override the default JSON content type.
	pub headers: HeaderMap,
	/// Request payload.
	pub body: RequestBody,
}
impl RequestOptions {
	/// `GET` with no body.
	pub fn get() -> Self {
		Self::default()
	}

	/// `POST` with no body.
	pub fn post() -> Self {
		Self::with_method(Method::POST)
	}

	/// `PUT` with no body.
	pub fn put() -> Self {
		Self::with_method(Method::PUT)
	}

	/// `PATCH` with no body.
	pub fn patch() -> Self {
		Self::with_method(Method::PATCH)
	}

	/// `DELETE` with no body.
	pub fn delete() -> Self {
		Self::with_method(Method::DELETE)
	}

	/// Any method with no body.
	pub fn with_method(method: Method) -> Self {
		Self { method, ..Default::default() }
	}

	/// Encodes `payload` as the JSON body.
	pub fn json<T>(mut self, payload: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = RequestBody::Json(serde_json::to_vec(payload).map_err(ConfigError::BodyEncode)?);

		Ok(self)
	}

	/// Uses `form` as an opaque multipart body.
	pub fn multipart(mut self, form: MultipartBody) -> Self {
		self.body = RequestBody::Multipart(form);

		self
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: &str, value: &str) -> Result<Self, ConfigError> {
		let invalid = || ConfigError::InvalidHeader { name: name.to_owned() };
		let name = HeaderName::try_from(name).map_err(|_| invalid())?;
		let value = HeaderValue::try_from(value).map_err(|_| invalid())?;

		self.headers.insert(name, value);

		Ok(self)
	}
}

/// Ephemeral description of one client call; re-rendered for the post-refresh retry.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
	/// Path appended to the base URL.
	pub path: String,
	/// Method, headers, and body.
	pub options: RequestOptions,
	/// Public or protected.
	pub access: Access,
}
impl OutboundRequest {
	/// Bundles a call's inputs.
	pub fn new(path: impl Into<String>, options: RequestOptions, access: Access) -> Self {
		Self { path: path.into(), options, access }
	}

	/// Renders the wire request, attaching `bearer` only to protected calls.
	///
	/// Headers are layered as: JSON content type, caller headers, multipart content type,
	/// credential. Public requests never carry an `Authorization` header.
	pub fn to_http(
		&self,
		config: &ClientConfig,
		bearer: Option<&TokenSecret>,
	) -> Result<HttpRequest, ConfigError> {
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

		for (name, value) in &self.options.headers {
			headers.insert(name.clone(), value.clone());
		}

		if let Some(content_type) = self.options.body.content_type() {
			let value = HeaderValue::try_from(content_type)
				.map_err(|_| ConfigError::InvalidHeader { name: CONTENT_TYPE.to_string() })?;

			headers.insert(CONTENT_TYPE, value);
		}

		match (self.access, bearer) {
			(Access::Public, _) => {
				headers.remove(AUTHORIZATION);
			},
			(Access::Protected, Some(token)) => {
				headers.insert(AUTHORIZATION, token.bearer_header()?);
			},
			(Access::Protected, None) => {},
		}

		let mut request = ::http::Request::builder()
			.method(self.options.method.clone())
			.uri(config.endpoint_url(&self.path)?.as_str())
			.body(self.options.body.bytes())?;

		*request.headers_mut() = headers;

		Ok(request)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> ClientConfig {
		ClientConfig::new("https://shop.example.com/api/v1").expect("Test base URL should parse.")
	}

	fn header<'a>(request: &'a HttpRequest, name: HeaderName) -> Option<&'a str> {
		request.headers().get(name).map(|value| value.to_str().expect("Header should be ASCII."))
	}

	#[test]
	fn protected_request_carries_bearer_and_json_type() {
		let token = TokenSecret::new("A1");
		let options = RequestOptions::post()
			.json(&serde_json::json!({ "sku": "BRK-100" }))
			.expect("JSON body should encode.");
		let request = OutboundRequest::new("/cart/items", options, Access::Protected)
			.to_http(&config(), Some(&token))
			.expect("Request should render.");

		assert_eq!(request.method(), &Method::POST);
		assert_eq!(request.uri(), "https://shop.example.com/api/v1/cart/items");
		assert_eq!(header(&request, AUTHORIZATION), Some("Bearer A1"));
		assert_eq!(header(&request, CONTENT_TYPE), Some(JSON_CONTENT_TYPE));
		assert_eq!(request.body(), br#"{"sku":"BRK-100"}"#);
	}

	#[test]
	fn public_request_strips_credentials() {
		let token = TokenSecret::new("A1");
		let options = RequestOptions::get()
			.header("authorization", "Bearer leaked")
			.expect("Header should be valid.");
		let request = OutboundRequest::new("/catalog/brands", options, Access::Public)
			.to_http(&config(), Some(&token))
			.expect("Request should render.");

		assert_eq!(header(&request, AUTHORIZATION), None);
	}

	#[test]
	fn caller_headers_override_default_content_type() {
		let options = RequestOptions::post()
			.header("content-type", "text/plain")
			.expect("Header should be valid.");
		let request = OutboundRequest::new("/feedback", options, Access::Protected)
			.to_http(&config(), None)
			.expect("Request should render.");

		assert_eq!(header(&request, CONTENT_TYPE), Some("text/plain"));
		assert_eq!(header(&request, AUTHORIZATION), None);
	}

	#[test]
	fn multipart_body_never_claims_json() {
		let form = MultipartBody::new()
			.text("vehicleId", "42")
			.file("photo", "front.jpg", "image/jpeg", &[0xff, 0xd8, 0xff]);
		let boundary_type = form.content_type().to_owned();
		let options = RequestOptions::post()
			.header("content-type", JSON_CONTENT_TYPE)
			.expect("Header should be valid.")
			.multipart(form);
		let request = OutboundRequest::new("/garage/photos", options, Access::Protected)
			.to_http(&config(), None)
			.expect("Request should render.");
		let content_type = header(&request, CONTENT_TYPE).expect("Multipart type should be set.");

		assert_eq!(content_type, boundary_type);
		assert!(content_type.starts_with("multipart/form-data; boundary="));

		let body = String::from_utf8_lossy(request.body());

		assert!(body.contains("Content-Disposition: form-data; name=\"vehicleId\"\r\n\r\n42\r\n"));
		assert!(body.contains("filename=\"front.jpg\"\r\nContent-Type: image/jpeg\r\n"));
		assert!(body.trim_end().ends_with("--"));
	}

	#[test]
	fn multipart_parameters_cannot_break_part_headers() {
		let form = MultipartBody::new()
			.text("note\"\r\nX-Injected: 1", "ok")
			.file("photo", "evil\".jpg\r\nContent-Type: text/html", "image/jpeg\r\nX: y", b"x");
		let body = String::from_utf8(form.to_bytes()).expect("Form should be UTF-8.");

		assert!(body.contains("name=\"note%22%0D%0AX-Injected: 1\""));
		assert!(body.contains("filename=\"evil%22.jpg%0D%0AContent-Type: text/html\""));
		assert!(body.contains("Content-Type: image/jpegX: y\r\n"));
		assert!(!body.contains("\r\nX-Injected"));
		assert!(!body.contains("\r\nX: y"));
	}

	#[test]
	fn localized_paths_are_percent_encoded() {
		let request = OutboundRequest::new(
			"/search?q=frein à disque",
			RequestOptions::get(),
			Access::Public,
		)
		.to_http(&config(), None)
		.expect("Accented queries should render.");

		assert_eq!(
			request.uri(),
			"https://shop.example.com/api/v1/search?q=frein%20%C3%A0%20disque"
		);
	}

	#[test]
	fn invalid_header_names_are_rejected() {
		let err = RequestOptions::get()
			.header("bad header", "x")
			.expect_err("Spaces are not valid in header names.");

		assert!(matches!(err, ConfigError::InvalidHeader { .. }));
	}
}
