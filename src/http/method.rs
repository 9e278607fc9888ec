//! Provides functionality for handling HTTP methods.

use std::fmt::Display;

/// Represents an HTTP method. Routes hold sets of these.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Method {
  /// The `GET` method.
  Get,
  /// The `POST` method.
  Post,
  /// The `PUT` method.
  Put,
  /// The `DELETE` method.
  Delete,
  /// The `PATCH` method.
  Patch,
  /// The `HEAD` method.
  Head,
  /// The `OPTIONS` method.
  Options,
  /// The `CONNECT` method.
  Connect,
  /// The `TRACE` method.
  Trace,
  /// Anything else the transport hands us.
  Custom(String),
}

impl Method {
  /// Converts an HTTP verb into an enum variant. Unknown verbs become `Custom`.
  ///
  /// ## Example
  /// ```
  /// let method = hanami::Method::from_name("GET");
  /// assert_eq!(method, hanami::Method::Get);
  /// ```
  pub fn from_name(name: &str) -> Self {
    match name {
      "GET" => Self::Get,
      "POST" => Self::Post,
      "PUT" => Self::Put,
      "DELETE" => Self::Delete,
      "PATCH" => Self::Patch,
      "HEAD" => Self::Head,
      "OPTIONS" => Self::Options,
      "CONNECT" => Self::Connect,
      "TRACE" => Self::Trace,
      _ => Self::Custom(name.to_string()),
    }
  }

  /// Returns the verb as it appears on the wire.
  pub fn as_str(&self) -> &str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
      Method::Patch => "PATCH",
      Method::Head => "HEAD",
      Method::Options => "OPTIONS",
      Method::Connect => "CONNECT",
      Method::Trace => "TRACE",
      Method::Custom(name) => name.as_str(),
    }
  }
}

impl From<&str> for Method {
  fn from(value: &str) -> Self {
    Method::from_name(value)
  }
}

impl Display for Method {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
