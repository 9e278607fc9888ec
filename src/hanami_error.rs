//! The error stack of the crate.

use crate::route_pattern::RouteParamType;
use crate::Response;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type HanamiResult<T> = Result<T, HanamiError>;

impl From<Response> for HanamiResult<Response> {
  fn from(value: Response) -> Self {
    Ok(value)
  }
}

impl From<HanamiError> for HanamiResult<Response> {
  fn from(value: HanamiError) -> Self {
    Err(value)
  }
}

/// Errors raised while compiling a route pattern into a regex.
#[derive(Debug)]
#[non_exhaustive]
pub enum PatternError {
  /// A nested regex fragment (the `R` in `{{s:R}}` and friends) failed to compile.
  NestedRegex {
    /// The full pattern the fragment was found in.
    pattern: String,
    /// The offending placeholder token, verbatim.
    token: String,
    /// The regex engine's error message.
    error: String,
  },
  /// A placeholder token recorded during the scan could not be found again
  /// during substitution. This is a library bug, not a user error.
  SubstitutionInvariant {
    /// The full pattern.
    pattern: String,
    /// The token that could not be re-located.
    token: String,
  },
  /// The assembled outer regex failed to compile.
  OuterRegex {
    /// The full pattern.
    pattern: String,
    /// The regex engine's error message.
    error: String,
  },
}

impl Display for PatternError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      PatternError::NestedRegex { pattern, token, error } => f.write_fmt(format_args!(
        "invalid nested regex in token '{token}' of pattern '{pattern}': {error}"
      )),
      PatternError::SubstitutionInvariant { pattern, token } => f.write_fmt(format_args!(
        "failed to transform pattern '{pattern}' into a regular expression: token '{token}' was not found during substitution. This is a library error and should be reported."
      )),
      PatternError::OuterRegex { pattern, error } => {
        f.write_fmt(format_args!("pattern '{pattern}' does not compile to a regex: {error}"))
      }
    }
  }
}
impl Error for PatternError {}

/// Errors raised when a pattern's parameter schema and a handler's parameter
/// list disagree. Both are fatal at route construction.
#[derive(Debug)]
#[non_exhaustive]
pub enum SchemaError {
  /// Pattern and handler declare a different number of parameters.
  ParamCountMismatch {
    /// The route pattern.
    pattern: String,
    /// Parameter types the pattern produces, in order.
    pattern_params: Vec<RouteParamType>,
    /// Parameter types the handler consumes, in order.
    handler_params: Vec<RouteParamType>,
  },
  /// Pattern and handler disagree on one parameter's type.
  ParamTypeMismatch {
    /// The route pattern.
    pattern: String,
    /// Zero-based index of the differing parameter.
    index: usize,
    /// The type the pattern produces at that index.
    pattern_type: RouteParamType,
    /// The type the handler expects at that index.
    handler_type: RouteParamType,
  },
}

impl Display for SchemaError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      SchemaError::ParamCountMismatch { pattern, pattern_params, handler_params } => {
        f.write_fmt(format_args!(
          "pattern parameter count != handler parameter count ({} vs {}) for pattern '{}': pattern parameters {:?}, handler parameters {:?}",
          pattern_params.len(),
          handler_params.len(),
          pattern,
          pattern_params,
          handler_params
        ))
      }
      SchemaError::ParamTypeMismatch { pattern, index, pattern_type, handler_type } => {
        f.write_fmt(format_args!(
          "pattern '{pattern}': pattern parameter {index} ({pattern_type}) does not match handler parameter {index} ({handler_type})"
        ))
      }
    }
  }
}
impl Error for SchemaError {}

/// Errors raised while validating a [`crate::ServerConfig`].
#[derive(Debug)]
#[non_exhaustive]
pub enum ConfigError {
  /// No listen address was provided.
  NoListeners,
  /// The worker thread count was zero.
  ZeroWorkerThreads,
  /// The request timeout was zero milliseconds.
  ZeroRequestTimeout,
  /// The file reader buffer size was outside (0, 1 GiB].
  FileReaderBufferSize(usize),
  /// The public directory does not exist or does not resolve to a directory.
  PublicDirectoryInvalid(PathBuf),
}

impl Display for ConfigError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      ConfigError::NoListeners => f.write_str("at least one listen address must be provided"),
      ConfigError::ZeroWorkerThreads => {
        f.write_str("the number of worker threads must be greater than zero")
      }
      ConfigError::ZeroRequestTimeout => {
        f.write_str("the request timeout must be greater than zero milliseconds")
      }
      ConfigError::FileReaderBufferSize(size) => f.write_fmt(format_args!(
        "the file reader buffer size ({size}) must be greater than zero and at most 1 GiB"
      )),
      ConfigError::PublicDirectoryInvalid(path) => f.write_fmt(format_args!(
        "the public directory '{}' does not exist or is not a directory",
        path.display()
      )),
    }
  }
}
impl Error for ConfigError {}

/// The kinds of fatal transport failures a streaming handler can be told about.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum TransportError {
  /// The peer reset or dropped the connection.
  ConnectionReset,
  /// Reading request bytes from the connection failed.
  ReadError,
  /// Writing response bytes to the connection failed.
  WriteError,
  /// The transport gave up waiting for the peer.
  Timeout,
  /// The request was cancelled before it finished.
  Canceled,
  /// Anything the transport cannot classify.
  Other(String),
}

impl Display for TransportError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      TransportError::ConnectionReset => f.write_str("connection reset"),
      TransportError::ReadError => f.write_str("read error"),
      TransportError::WriteError => f.write_str("write error"),
      TransportError::Timeout => f.write_str("transport timeout"),
      TransportError::Canceled => f.write_str("canceled"),
      TransportError::Other(msg) => f.write_str(msg),
    }
  }
}
impl Error for TransportError {}

/// The crate-wide error type.
#[derive(Debug)]
#[non_exhaustive]
pub enum HanamiError {
  /// A route pattern failed to compile.
  Pattern(PatternError),
  /// A pattern and a handler disagreed on the parameter schema.
  Schema(SchemaError),
  /// A configuration value failed validation.
  Config(ConfigError),
  /// An I/O error.
  IO(io::Error),
  /// A JSON body failed to parse or serialize.
  Json(serde_json::Error),
  /// Anything a user handler wants to bubble up.
  Other(Box<dyn Error + Send + Sync>),
}

impl HanamiError {
  /// Creates an `IO` variant from a kind and message.
  pub fn new_io<E: Into<Box<dyn Error + Send + Sync>>>(kind: ErrorKind, message: E) -> HanamiError {
    io::Error::new(kind, message).into()
  }

  /// Creates an `Other` variant from any displayable message.
  pub fn msg(message: impl Display) -> HanamiError {
    HanamiError::Other(message.to_string().into())
  }

  /// Best-effort mapping to an [`io::ErrorKind`].
  pub fn kind(&self) -> ErrorKind {
    match self {
      HanamiError::IO(io) => io.kind(),
      HanamiError::Json(_) => ErrorKind::InvalidData,
      _ => ErrorKind::Other,
    }
  }

  /// Attempts to view the underlying error as `T`.
  pub fn downcast_ref<T: Error + Send + 'static>(&self) -> Option<&T> {
    match self {
      HanamiError::Pattern(err) => (err as &dyn Error).downcast_ref::<T>(),
      HanamiError::Schema(err) => (err as &dyn Error).downcast_ref::<T>(),
      HanamiError::Config(err) => (err as &dyn Error).downcast_ref::<T>(),
      HanamiError::IO(err) => (err as &dyn Error).downcast_ref::<T>(),
      HanamiError::Json(err) => (err as &dyn Error).downcast_ref::<T>(),
      HanamiError::Other(other) => other.downcast_ref::<T>(),
    }
  }

  /// Unwraps the error into a boxed dyn Error.
  pub fn into_inner(self) -> Box<dyn Error + Send + Sync + 'static> {
    match self {
      HanamiError::Pattern(err) => Box::new(err) as Box<dyn Error + Send + Sync>,
      HanamiError::Schema(err) => Box::new(err) as Box<dyn Error + Send + Sync>,
      HanamiError::Config(err) => Box::new(err) as Box<dyn Error + Send + Sync>,
      HanamiError::IO(err) => Box::new(err) as Box<dyn Error + Send + Sync>,
      HanamiError::Json(err) => Box::new(err) as Box<dyn Error + Send + Sync>,
      HanamiError::Other(other) => other,
    }
  }
}

impl Display for HanamiError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      HanamiError::Pattern(err) => Display::fmt(err, f),
      HanamiError::Schema(err) => Display::fmt(err, f),
      HanamiError::Config(err) => Display::fmt(err, f),
      HanamiError::IO(err) => Display::fmt(err, f),
      HanamiError::Json(err) => Display::fmt(err, f),
      HanamiError::Other(err) => Display::fmt(err, f),
    }
  }
}

impl<T> From<T> for HanamiError
where
  T: Error + Send + Sync + 'static,
{
  fn from(value: T) -> Self {
    let mut dyn_box = Box::new(value) as Box<dyn Error + Send + Sync>;
    dyn_box = match dyn_box.downcast::<io::Error>() {
      Ok(err) => return HanamiError::IO(*err),
      Err(err) => err,
    };
    dyn_box = match dyn_box.downcast::<serde_json::Error>() {
      Ok(err) => return HanamiError::Json(*err),
      Err(err) => err,
    };
    dyn_box = match dyn_box.downcast::<PatternError>() {
      Ok(err) => return HanamiError::Pattern(*err),
      Err(err) => err,
    };
    dyn_box = match dyn_box.downcast::<SchemaError>() {
      Ok(err) => return HanamiError::Schema(*err),
      Err(err) => err,
    };
    dyn_box = match dyn_box.downcast::<ConfigError>() {
      Ok(err) => return HanamiError::Config(*err),
      Err(err) => err,
    };

    HanamiError::Other(dyn_box)
  }
}

impl From<HanamiError> for Box<dyn Error + Send> {
  fn from(value: HanamiError) -> Self {
    value.into_inner()
  }
}

impl From<HanamiError> for io::Error {
  fn from(value: HanamiError) -> Self {
    match value {
      HanamiError::IO(io) => io,
      err => io::Error::new(err.kind(), err.into_inner()),
    }
  }
}
