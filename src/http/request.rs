//! Provides functionality for handling HTTP requests.

use crate::http::cookie::Cookie;
use crate::http::headers::{HeaderName, Headers};
use crate::http::method::Method;
use crate::percent;
use crate::HanamiResult;

/// The routed part of a request: method, decoded path, raw query pairs and
/// headers. The transport builds one of these as soon as the request head has
/// been parsed; the body may still be in flight at that point.
#[derive(Clone, Debug)]
pub struct RequestHead {
  /// The method used in making the request, e.g. "GET".
  method: Method,

  /// The URL-decoded path. If the path fails to decode, the raw path is kept
  /// so the request can still be routed (and rejected) meaningfully.
  path: String,

  /// Query pairs exactly as they appeared on the wire, in order of appearance.
  /// Decoding happens at lookup time, see [`Request::query_param`].
  query: Vec<(String, String)>,

  /// A list of headers included in the request.
  headers: Headers,
}

impl RequestHead {
  /// Builds a request head from the transport's artifacts. `target` is the
  /// request target as it appeared on the status line (path plus optional
  /// `?query`).
  pub fn new(method: Method, target: &str, headers: Headers) -> Self {
    let (raw_path, raw_query) = match target.split_once('?') {
      Some((p, q)) => (p, q),
      None => (target, ""),
    };

    let path =
      percent::decode_path(raw_path).unwrap_or_else(|| raw_path.to_string());

    let mut query = Vec::new();
    if !raw_query.is_empty() {
      for pair in raw_query.split('&') {
        match pair.split_once('=') {
          Some((k, v)) => query.push((k.to_string(), v.to_string())),
          None => query.push((pair.to_string(), String::new())),
        }
      }
    }

    Self { method, path, query, headers }
  }

  /// The request method.
  pub fn method(&self) -> &Method {
    &self.method
  }

  /// The URL-decoded path the request will be routed on.
  pub fn path(&self) -> &str {
    self.path.as_str()
  }

  /// The raw query pairs in order of appearance, undecoded.
  pub fn raw_query(&self) -> &[(String, String)] {
    self.query.as_slice()
  }

  /// The header bag.
  pub fn headers(&self) -> &Headers {
    &self.headers
  }

  /// Returns the header value iff exactly one header with the name is present.
  pub fn header(&self, name: impl Into<HeaderName>) -> Option<&str> {
    self.headers.get(name)
  }
}

/// A possibly-chained byte sequence. The transport appends chunks as they
/// arrive; consumers flatten on demand.
#[derive(Clone, Debug, Default)]
pub struct BodyChain(Vec<Vec<u8>>);

impl BodyChain {
  /// An empty chain.
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends a chunk to the end of the chain. Empty chunks are kept, they are
  /// harmless.
  pub fn append(&mut self, chunk: Vec<u8>) {
    self.0.push(chunk);
  }

  /// Total byte length across all chunks.
  pub fn len(&self) -> usize {
    self.0.iter().map(Vec::len).sum()
  }

  /// Returns `true` if the chain holds no bytes.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Iterates the chunks in arrival order.
  pub fn chunks(&self) -> impl Iterator<Item = &[u8]> {
    self.0.iter().map(Vec::as_slice)
  }

  /// Flattens the chain into one contiguous buffer.
  pub fn to_bytes(&self) -> Vec<u8> {
    let mut out = Vec::with_capacity(self.len());
    for chunk in &self.0 {
      out.extend_from_slice(chunk);
    }
    out
  }
}

impl From<Vec<u8>> for BodyChain {
  fn from(value: Vec<u8>) -> Self {
    Self(vec![value])
  }
}

impl From<&[u8]> for BodyChain {
  fn from(value: &[u8]) -> Self {
    Self(vec![value.to_vec()])
  }
}

impl From<&str> for BodyChain {
  fn from(value: &str) -> Self {
    Self(vec![value.as_bytes().to_vec()])
  }
}

/// An immutable view of a complete request: the head plus the accumulated
/// body. Owned by the pipeline until the handler returns.
#[derive(Clone, Debug)]
pub struct Request {
  head: RequestHead,
  body: BodyChain,
}

impl Request {
  /// Combines a head and a sealed body chain.
  pub fn new(head: RequestHead, body: BodyChain) -> Self {
    Self { head, body }
  }

  /// The request head.
  pub fn head(&self) -> &RequestHead {
    &self.head
  }

  /// The request method.
  pub fn method(&self) -> &Method {
    self.head.method()
  }

  /// The URL-decoded path.
  pub fn path(&self) -> &str {
    self.head.path()
  }

  /// The header bag.
  pub fn headers(&self) -> &Headers {
    self.head.headers()
  }

  /// Returns the header value iff exactly one header with the name is present.
  pub fn header(&self, name: impl Into<HeaderName>) -> Option<&str> {
    self.head.header(name)
  }

  /// Looks up the first query parameter matching `key` and returns its
  /// decoded value.
  ///
  /// The key is first compared against the stored keys as-is; when that finds
  /// nothing, every stored key is URL-decoded and compared, which handles
  /// lookup keys containing characters that arrived encoded. Parameters whose
  /// key or value carries a malformed percent-encoding are skipped silently.
  pub fn query_param(&self, key: impl AsRef<str>) -> Option<String> {
    let key = key.as_ref();
    for (k, v) in self.head.raw_query() {
      if k == key {
        if let Some(decoded) = percent::decode_query(v) {
          return Some(decoded);
        }
      }
    }

    for (k, v) in self.head.raw_query() {
      match percent::decode_query(k) {
        Some(decoded_key) if decoded_key == key => {
          if let Some(decoded) = percent::decode_query(v) {
            return Some(decoded);
          }
        }
        _ => {}
      }
    }

    None
  }

  /// Returns the decoded values of every query parameter matching `key`, in
  /// order of appearance. Malformed entries are skipped.
  pub fn query_params(&self, key: impl AsRef<str>) -> Vec<String> {
    let key = key.as_ref();
    let mut result = Vec::new();
    for (k, v) in self.head.raw_query() {
      let matches = k == key || percent::decode_query(k).as_deref() == Some(key);
      if !matches {
        continue;
      }
      if let Some(decoded) = percent::decode_query(v) {
        result.push(decoded);
      }
    }
    result
  }

  /// Parses the cookies from the `Cookie` header.
  pub fn cookies(&self) -> Vec<Cookie> {
    self
      .head
      .headers()
      .get_all(HeaderName::Cookie)
      .into_iter()
      .next()
      .map(|cookies| {
        cookies
          .split(';')
          .filter_map(|cookie| {
            let (k, v) = cookie.split_once('=')?;
            Some(Cookie::new(k.trim(), v.trim()))
          })
          .collect()
      })
      .unwrap_or_default()
  }

  /// Attempts to get a specific cookie from the request.
  pub fn cookie(&self, name: impl AsRef<str>) -> Option<Cookie> {
    self.cookies().into_iter().find(|cookie| cookie.name == name.as_ref())
  }

  /// The body chain.
  pub fn body(&self) -> &BodyChain {
    &self.body
  }

  /// The body flattened into one buffer.
  pub fn body_as_bytes(&self) -> Vec<u8> {
    self.body.to_bytes()
  }

  /// The body flattened and interpreted as utf8, lossily.
  pub fn body_as_string(&self) -> String {
    String::from_utf8_lossy(&self.body.to_bytes()).into_owned()
  }

  /// The body parsed as JSON.
  pub fn body_as_json(&self) -> HanamiResult<serde_json::Value> {
    Ok(serde_json::from_slice(&self.body.to_bytes())?)
  }
}
