//! Provides functionality for handling cookies.

/// Represents a cookie pair parsed from the `Cookie` request header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cookie {
  /// The name of the cookie.
  pub name: String,
  /// The value of the cookie.
  pub value: String,
}

impl Cookie {
  /// Create a new cookie with the given name and value.
  pub fn new(name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
    Self { name: name.as_ref().to_string(), value: value.as_ref().to_string() }
  }
}
