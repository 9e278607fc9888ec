//! Provides functionality for handling HTTP headers.

use std::fmt::Display;

/// Represents a collection of headers as part of a request or response.
///
/// Headers keep their insertion order and may repeat. Lookups are
/// case-insensitive. [`Headers::get`] follows the single-value contract: it
/// returns the value only when exactly one header with that name is present;
/// callers that expect multiples must use [`Headers::get_all`].
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Headers(Vec<Header>);

/// Represents an individual header.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Header {
  /// The name of the header.
  pub name: HeaderName,
  /// The value of the header.
  pub value: String,
}

impl Headers {
  /// Create an empty collection of headers.
  pub fn new() -> Self {
    Self::default()
  }

  /// Get the number of headers in the collection.
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Returns `true` if the collection is empty.
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Create and add a new header with the given name and value.
  /// Existing headers with the same name are kept.
  pub fn add(&mut self, name: impl Into<HeaderName>, value: impl AsRef<str>) {
    self.0.push(Header::new(name, value));
  }

  /// Removes all previous instances of the header and adds it with the single value.
  pub fn set(&mut self, name: impl Into<HeaderName>, value: impl AsRef<str>) {
    let header = name.into();
    self.remove(header.clone());
    self.add(header, value);
  }

  /// Returns the value of the header iff exactly one header with the name is present.
  pub fn get(&self, name: impl Into<HeaderName>) -> Option<&str> {
    let header = name.into();
    let mut it = self.0.iter().filter(|h| h.name == header);
    let first = it.next()?;
    if it.next().is_some() {
      return None;
    }
    Some(first.value.as_str())
  }

  /// Get a list of all the values of the headers with the given name, in
  /// insertion order. Empty if none exist.
  pub fn get_all(&self, name: impl Into<HeaderName>) -> Vec<&str> {
    let header = name.into();
    self.0.iter().filter(|h| h.name == header).map(|h| h.value.as_str()).collect()
  }

  /// Remove all headers with the given name.
  pub fn remove(&mut self, name: impl Into<HeaderName>) {
    let header = name.into();
    self.0.retain(|h| h.name != header);
  }

  /// Return an iterator over the headers in insertion order.
  pub fn iter(&self) -> impl Iterator<Item = &Header> {
    self.0.iter()
  }
}

impl Header {
  /// Create a new header with the given name and value.
  pub fn new(name: impl Into<HeaderName>, value: impl AsRef<str>) -> Self {
    Self { name: name.into(), value: value.as_ref().to_string() }
  }
}

impl<N: Into<HeaderName>, V: AsRef<str>> FromIterator<(N, V)> for Headers {
  fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
    let mut headers = Headers::new();
    for (name, value) in iter {
      headers.add(name, value);
    }
    headers
  }
}

/// A header name. Well-known names get a variant; everything else is carried
/// as `Custom` with its original casing. Equality and hashing are
/// case-insensitive across all variants.
#[derive(Clone, Debug, Eq)]
pub enum HeaderName {
  /// Informs the server about the types of data that can be sent back.
  Accept,
  /// Lists the set of methods supported by a resource.
  Allow,
  /// Provides credentials for HTTP authentication.
  Authorization,
  /// Indicates how the cache should behave.
  CacheControl,
  /// Indicates what should happen to the connection after the request is served.
  Connection,
  /// Indicates the length of the payload body.
  ContentLength,
  /// Indicates the MIME type of the payload body.
  ContentType,
  /// Shares any applicable HTTP cookies with the server.
  Cookie,
  /// Indicates the date and time at which the message was sent.
  Date,
  /// Specifies the host to which the request is being sent.
  Host,
  /// Makes the request conditional on the resource having changed since the given date.
  IfModifiedSince,
  /// Indicates the date and time at which the resource was last modified.
  LastModified,
  /// Indicates the location at which a resource can be found, used for redirects.
  Location,
  /// Tells the client to store a cookie.
  SetCookie,
  /// Lists any encodings used on the payload.
  TransferEncoding,
  /// Identifies the client software.
  UserAgent,
  /// Any header name without a variant, stored as written.
  Custom(String),
}

impl PartialEq for HeaderName {
  fn eq(&self, other: &Self) -> bool {
    self.as_str().eq_ignore_ascii_case(other.as_str())
  }
}

impl std::hash::Hash for HeaderName {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    for byte in self.as_str().bytes() {
      state.write_u8(byte.to_ascii_lowercase());
    }
  }
}

impl HeaderName {
  /// The canonical wire spelling of the header name.
  pub fn as_str(&self) -> &str {
    match self {
      HeaderName::Accept => "Accept",
      HeaderName::Allow => "Allow",
      HeaderName::Authorization => "Authorization",
      HeaderName::CacheControl => "Cache-Control",
      HeaderName::Connection => "Connection",
      HeaderName::ContentLength => "Content-Length",
      HeaderName::ContentType => "Content-Type",
      HeaderName::Cookie => "Cookie",
      HeaderName::Date => "Date",
      HeaderName::Host => "Host",
      HeaderName::IfModifiedSince => "If-Modified-Since",
      HeaderName::LastModified => "Last-Modified",
      HeaderName::Location => "Location",
      HeaderName::SetCookie => "Set-Cookie",
      HeaderName::TransferEncoding => "Transfer-Encoding",
      HeaderName::UserAgent => "User-Agent",
      HeaderName::Custom(name) => name.as_str(),
    }
  }
}

impl From<&str> for HeaderName {
  fn from(value: &str) -> Self {
    let lower = value.to_ascii_lowercase();
    match lower.as_str() {
      "accept" => HeaderName::Accept,
      "allow" => HeaderName::Allow,
      "authorization" => HeaderName::Authorization,
      "cache-control" => HeaderName::CacheControl,
      "connection" => HeaderName::Connection,
      "content-length" => HeaderName::ContentLength,
      "content-type" => HeaderName::ContentType,
      "cookie" => HeaderName::Cookie,
      "date" => HeaderName::Date,
      "host" => HeaderName::Host,
      "if-modified-since" => HeaderName::IfModifiedSince,
      "last-modified" => HeaderName::LastModified,
      "location" => HeaderName::Location,
      "set-cookie" => HeaderName::SetCookie,
      "transfer-encoding" => HeaderName::TransferEncoding,
      "user-agent" => HeaderName::UserAgent,
      _ => HeaderName::Custom(value.to_string()),
    }
  }
}

impl From<String> for HeaderName {
  fn from(value: String) -> Self {
    HeaderName::from(value.as_str())
  }
}

impl From<&HeaderName> for HeaderName {
  fn from(value: &HeaderName) -> Self {
    value.clone()
  }
}

impl Display for HeaderName {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
