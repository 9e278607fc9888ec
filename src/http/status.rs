//! Provides functionality for handling HTTP status codes.

use crate::util::three_digit_to_utf;
use std::fmt::Display;

/// Represents an HTTP status code.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
  /// `100 Continue`: Continue with request.
  Continue,
  /// `101 Switching Protocols`: Protocol upgrade.
  SwitchingProtocols,
  /// `200 OK`: Request succeeded.
  OK,
  /// `201 Created`: Resource created.
  Created,
  /// `202 Accepted`: Request received, but not yet acted upon.
  Accepted,
  /// `204 No Content`: There is no content to send for this request.
  NoContent,
  /// `301 Moved Permanently`: The resource has moved permanently to a new location.
  MovedPermanently,
  /// `302 Found`: The resource has moved temporarily to a new location.
  Found,
  /// `303 See Other`: The resource can be found under a different URI.
  SeeOther,
  /// `304 Not Modified`: The resource has not been modified since the last request.
  NotModified,
  /// `307 Temporary Redirect`: The resource has moved temporarily to a new location.
  TemporaryRedirect,
  /// `308 Permanent Redirect`: The resource has moved permanently to a new location.
  PermanentRedirect,
  /// `400 Bad Request`: The request could not be understood by the server.
  BadRequest,
  /// `401 Unauthorized`: The request requires user authentication.
  Unauthorized,
  /// `403 Forbidden`: The client is not allowed to access this content.
  Forbidden,
  /// `404 Not Found`: The server can not find the requested resource.
  NotFound,
  /// `405 Method Not Allowed`: The method specified in the request is not allowed for the resource.
  MethodNotAllowed,
  /// `406 Not Acceptable`: No content that meets the criteria is available.
  NotAcceptable,
  /// `408 Request Timeout`: The server timed out waiting for the request.
  RequestTimeout,
  /// `409 Conflict`: The request conflicts with the server's current state.
  Conflict,
  /// `410 Gone`: The requested resource is no longer available.
  Gone,
  /// `411 Length Required`: The request did not specify the length of its content.
  LengthRequired,
  /// `412 Precondition Failed`: The server does not meet one of the client's preconditions.
  PreconditionFailed,
  /// `413 Content Too Large`: The request is larger than the server is willing or able to process.
  ContentTooLarge,
  /// `415 Unsupported Media Type`: The request entity has a media type which the server does not support.
  UnsupportedMediaType,
  /// `417 Expectation Failed`: The expectation given in the `Expect` header could not be met.
  ExpectationFailed,
  /// `500 Internal Server Error`: The server encountered an unexpected error.
  InternalServerError,
  /// `501 Not Implemented`: The server does not support the functionality required.
  NotImplemented,
  /// `502 Bad Gateway`: Invalid response from the upstream server.
  BadGateway,
  /// `503 Service Unavailable`: The server is temporarily unable to handle the request.
  ServiceUnavailable,
  /// `504 Gateway Timeout`: No timely response from the upstream server.
  GatewayTimeout,
  /// `505 HTTP Version Not Supported`.
  VersionNotSupported,
  /// Any other status code. The error-fallback table is keyed by plain
  /// numbers, so unknown codes must survive a round trip through here.
  Custom(u16, [u8; 3]),
}

impl StatusCode {
  /// Maps a numeric code to a variant. Unknown codes become `Custom`.
  /// Codes outside 100..=999 are clamped to `InternalServerError`.
  pub fn from_code(code: u16) -> Self {
    match code {
      100 => StatusCode::Continue,
      101 => StatusCode::SwitchingProtocols,
      200 => StatusCode::OK,
      201 => StatusCode::Created,
      202 => StatusCode::Accepted,
      204 => StatusCode::NoContent,
      301 => StatusCode::MovedPermanently,
      302 => StatusCode::Found,
      303 => StatusCode::SeeOther,
      304 => StatusCode::NotModified,
      307 => StatusCode::TemporaryRedirect,
      308 => StatusCode::PermanentRedirect,
      400 => StatusCode::BadRequest,
      401 => StatusCode::Unauthorized,
      403 => StatusCode::Forbidden,
      404 => StatusCode::NotFound,
      405 => StatusCode::MethodNotAllowed,
      406 => StatusCode::NotAcceptable,
      408 => StatusCode::RequestTimeout,
      409 => StatusCode::Conflict,
      410 => StatusCode::Gone,
      411 => StatusCode::LengthRequired,
      412 => StatusCode::PreconditionFailed,
      413 => StatusCode::ContentTooLarge,
      415 => StatusCode::UnsupportedMediaType,
      417 => StatusCode::ExpectationFailed,
      500 => StatusCode::InternalServerError,
      501 => StatusCode::NotImplemented,
      502 => StatusCode::BadGateway,
      503 => StatusCode::ServiceUnavailable,
      504 => StatusCode::GatewayTimeout,
      505 => StatusCode::VersionNotSupported,
      code if (100..=999).contains(&code) => StatusCode::Custom(code, three_digit_to_utf(code)),
      _ => StatusCode::InternalServerError,
    }
  }

  /// The numeric code.
  pub fn code(&self) -> u16 {
    match self {
      StatusCode::Continue => 100,
      StatusCode::SwitchingProtocols => 101,
      StatusCode::OK => 200,
      StatusCode::Created => 201,
      StatusCode::Accepted => 202,
      StatusCode::NoContent => 204,
      StatusCode::MovedPermanently => 301,
      StatusCode::Found => 302,
      StatusCode::SeeOther => 303,
      StatusCode::NotModified => 304,
      StatusCode::TemporaryRedirect => 307,
      StatusCode::PermanentRedirect => 308,
      StatusCode::BadRequest => 400,
      StatusCode::Unauthorized => 401,
      StatusCode::Forbidden => 403,
      StatusCode::NotFound => 404,
      StatusCode::MethodNotAllowed => 405,
      StatusCode::NotAcceptable => 406,
      StatusCode::RequestTimeout => 408,
      StatusCode::Conflict => 409,
      StatusCode::Gone => 410,
      StatusCode::LengthRequired => 411,
      StatusCode::PreconditionFailed => 412,
      StatusCode::ContentTooLarge => 413,
      StatusCode::UnsupportedMediaType => 415,
      StatusCode::ExpectationFailed => 417,
      StatusCode::InternalServerError => 500,
      StatusCode::NotImplemented => 501,
      StatusCode::BadGateway => 502,
      StatusCode::ServiceUnavailable => 503,
      StatusCode::GatewayTimeout => 504,
      StatusCode::VersionNotSupported => 505,
      StatusCode::Custom(code, _) => *code,
    }
  }

  /// The numeric code as three ascii digits, ready for the status line.
  pub fn code_as_utf(&self) -> [u8; 3] {
    match self {
      StatusCode::Custom(_, utf) => *utf,
      other => three_digit_to_utf(other.code()),
    }
  }

  /// The canonical reason phrase.
  pub fn status_line(&self) -> &str {
    match self {
      StatusCode::Continue => "Continue",
      StatusCode::SwitchingProtocols => "Switching Protocols",
      StatusCode::OK => "OK",
      StatusCode::Created => "Created",
      StatusCode::Accepted => "Accepted",
      StatusCode::NoContent => "No Content",
      StatusCode::MovedPermanently => "Moved Permanently",
      StatusCode::Found => "Found",
      StatusCode::SeeOther => "See Other",
      StatusCode::NotModified => "Not Modified",
      StatusCode::TemporaryRedirect => "Temporary Redirect",
      StatusCode::PermanentRedirect => "Permanent Redirect",
      StatusCode::BadRequest => "Bad Request",
      StatusCode::Unauthorized => "Unauthorized",
      StatusCode::Forbidden => "Forbidden",
      StatusCode::NotFound => "Not Found",
      StatusCode::MethodNotAllowed => "Method Not Allowed",
      StatusCode::NotAcceptable => "Not Acceptable",
      StatusCode::RequestTimeout => "Request Timeout",
      StatusCode::Conflict => "Conflict",
      StatusCode::Gone => "Gone",
      StatusCode::LengthRequired => "Length Required",
      StatusCode::PreconditionFailed => "Precondition Failed",
      StatusCode::ContentTooLarge => "Content Too Large",
      StatusCode::UnsupportedMediaType => "Unsupported Media Type",
      StatusCode::ExpectationFailed => "Expectation Failed",
      StatusCode::InternalServerError => "Internal Server Error",
      StatusCode::NotImplemented => "Not Implemented",
      StatusCode::BadGateway => "Bad Gateway",
      StatusCode::ServiceUnavailable => "Service Unavailable",
      StatusCode::GatewayTimeout => "Gateway Timeout",
      StatusCode::VersionNotSupported => "HTTP Version Not Supported",
      StatusCode::Custom(_, _) => "Unknown Status",
    }
  }
}

impl From<u16> for StatusCode {
  fn from(code: u16) -> Self {
    StatusCode::from_code(code)
  }
}

impl Display for StatusCode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("{} {}", self.code(), self.status_line()))
  }
}
