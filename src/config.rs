//! Server configuration, validated at construction.

use crate::hanami_error::ConfigError;
use crate::HanamiResult;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The default chunk size for the static file reader.
pub const DEFAULT_FILE_READER_BUFFER_SIZE: usize = 4096;

const MAX_FILE_READER_BUFFER_SIZE: usize = 1024 * 1024 * 1024;

/// The protocol a listener speaks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Protocol {
  /// Plain HTTP.
  Http,
  /// HTTP over TLS. The TLS layer itself belongs to the transport.
  Https,
}

/// One listen address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Listener {
  /// Host or address to bind.
  pub host: String,
  /// Port to bind.
  pub port: u16,
  /// Protocol for this listener.
  pub protocol: Protocol,
}

impl Listener {
  /// Creates a listener entry.
  pub fn new(host: impl ToString, port: u16, protocol: Protocol) -> Self {
    Self { host: host.to_string(), port, protocol }
  }
}

/// Validated server configuration.
///
/// Invalid values fail construction instead of surfacing later: at least one
/// listener, more than zero worker threads, a positive request timeout, a
/// file reader buffer size within (0, 1 GiB], and a public directory that
/// actually resolves to a directory.
#[derive(Clone, Debug)]
pub struct ServerConfig {
  listeners: Vec<Listener>,
  worker_threads: usize,
  request_timeout: Duration,
  file_reader_buffer_size: usize,
  public_directory: Option<PathBuf>,
}

impl ServerConfig {
  /// Creates a configuration from the required options.
  pub fn new(
    listeners: Vec<Listener>,
    worker_threads: usize,
    request_timeout: Duration,
  ) -> HanamiResult<Self> {
    if listeners.is_empty() {
      return Err(ConfigError::NoListeners.into());
    }
    if worker_threads == 0 {
      return Err(ConfigError::ZeroWorkerThreads.into());
    }
    if request_timeout.is_zero() {
      return Err(ConfigError::ZeroRequestTimeout.into());
    }

    Ok(Self {
      listeners,
      worker_threads,
      request_timeout,
      file_reader_buffer_size: DEFAULT_FILE_READER_BUFFER_SIZE,
      public_directory: None,
    })
  }

  /// Sets the chunk size for the static file reader. Must be within (0, 1 GiB].
  pub fn with_file_reader_buffer_size(mut self, size: usize) -> HanamiResult<Self> {
    if size == 0 || size > MAX_FILE_READER_BUFFER_SIZE {
      return Err(ConfigError::FileReaderBufferSize(size).into());
    }
    self.file_reader_buffer_size = size;
    Ok(self)
  }

  /// Sets the base directory for the default static file mount. The path must
  /// exist and be (or resolve, through symlinks, to) a directory.
  pub fn with_public_directory(mut self, path: impl AsRef<Path>) -> HanamiResult<Self> {
    let path = path.as_ref();
    if !path.is_dir() {
      return Err(ConfigError::PublicDirectoryInvalid(path.to_path_buf()).into());
    }
    self.public_directory = Some(path.to_path_buf());
    Ok(self)
  }

  /// The listen addresses.
  pub fn listeners(&self) -> &[Listener] {
    self.listeners.as_slice()
  }

  /// The size of the I/O worker pool.
  pub fn worker_threads(&self) -> usize {
    self.worker_threads
  }

  /// The wall-clock bound per buffered request.
  pub fn request_timeout(&self) -> Duration {
    self.request_timeout
  }

  /// The chunk size for the static file reader.
  pub fn file_reader_buffer_size(&self) -> usize {
    self.file_reader_buffer_size
  }

  /// The base directory for the default static file mount, if configured.
  pub fn public_directory(&self) -> Option<&Path> {
    self.public_directory.as_deref()
  }
}
