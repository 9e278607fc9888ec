//! Provides functionality for handling HTTP responses.

use crate::http::headers::{HeaderName, Headers};
use crate::http::status::StatusCode;

/// Represents a response from the server.
///
/// Mutable while it is being built, handed to the transport wholesale once the
/// pipeline emits it. The core does not synthesize default headers
/// (Content-Length, Date, ...); the transport fills in what it normally would.
///
/// ## Creation
/// ```
/// use hanami::{Response, StatusCode};
/// Response::new(StatusCode::NoContent);
/// Response::from_string(200, "Success");
/// Response::from_json(200, &serde_json::json!({"ok": true}), [("X-Job", "1")]);
/// ```
#[derive(Debug)]
pub struct Response {
  /// The status code of the response, for example 200 OK.
  pub status_code: StatusCode,
  /// A list of the headers included in the response.
  pub headers: Headers,
  /// The body of the response. May be empty; an empty body is still emitted.
  pub body: Vec<u8>,
}

impl Response {
  /// Creates a new response with the given status code, no headers and an
  /// empty body.
  pub fn new(status_code: impl Into<StatusCode>) -> Self {
    Self { status_code: status_code.into(), headers: Headers::new(), body: Vec::new() }
  }

  /// Creates a response carrying a string body.
  pub fn from_string(status_code: impl Into<StatusCode>, body: impl AsRef<str>) -> Self {
    Self {
      status_code: status_code.into(),
      headers: Headers::new(),
      body: body.as_ref().as_bytes().to_vec(),
    }
  }

  /// Creates a response carrying the serialized JSON value, with the given
  /// headers copied in verbatim. Sets `Content-Type: application/json` unless
  /// the supplied headers already carry a content type.
  pub fn from_json<N: Into<HeaderName>, V: AsRef<str>>(
    status_code: impl Into<StatusCode>,
    body: &serde_json::Value,
    headers: impl IntoIterator<Item = (N, V)>,
  ) -> Self {
    let mut headers: Headers = headers.into_iter().collect();
    if headers.get_all(HeaderName::ContentType).is_empty() {
      headers.add(HeaderName::ContentType, "application/json");
    }

    Self { status_code: status_code.into(), headers, body: body.to_string().into_bytes() }
  }

  /// Creates a response carrying raw bytes, with the given headers copied in
  /// verbatim.
  pub fn from_bytes<N: Into<HeaderName>, V: AsRef<str>>(
    status_code: impl Into<StatusCode>,
    body: Vec<u8>,
    headers: impl IntoIterator<Item = (N, V)>,
  ) -> Self {
    Self { status_code: status_code.into(), headers: headers.into_iter().collect(), body }
  }

  /// HTTP 200 OK with a string body.
  pub fn ok(body: impl AsRef<str>) -> Self {
    Self::from_string(StatusCode::OK, body)
  }

  /// HTTP 404 Not Found without a body.
  pub fn not_found() -> Self {
    Self::new(StatusCode::NotFound)
  }

  /// HTTP 304 Not Modified.
  pub fn not_modified() -> Self {
    Self::new(StatusCode::NotModified)
  }

  /// Adds the given header to the response.
  /// Returns itself for use in a builder pattern.
  pub fn with_header(mut self, header: impl Into<HeaderName>, value: impl AsRef<str>) -> Self {
    self.headers.add(header, value);
    self
  }

  /// Replaces the body.
  pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
    self.body = body.into();
    self
  }

  /// The status code.
  pub fn status_code(&self) -> &StatusCode {
    &self.status_code
  }

  /// The response headers.
  pub fn headers(&self) -> &Headers {
    &self.headers
  }

  /// The body bytes.
  pub fn body(&self) -> &[u8] {
    self.body.as_slice()
  }
}
