//! A streaming handler that serves files from a base directory.
//!
//! The worked example of the streaming lifecycle: the route hands it the
//! requested path as its single string parameter, the conditional-GET header
//! is evaluated against the file's mtime, and the file is read and emitted in
//! chunks on the I/O worker pool while the response loop writes them out.

use crate::config::DEFAULT_FILE_READER_BUFFER_SIZE;
use crate::hanami_error::TransportError;
use crate::http::headers::HeaderName;
use crate::route::Route;
use crate::route_pattern::{PathArgs, RouteParamType};
use crate::streaming_pipeline::{StreamSink, StreamingArgs, StreamingHandler};
use crate::util::next_id;
use crate::{HanamiResult, Method, Request, Response, StatusCode, WorkerPool};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Serves one file per request, streamed in `read_buffer_size`-byte chunks.
pub struct StreamingFileHandler {
  id: u128,
  base_path: PathBuf,
  resolved_path: PathBuf,
  raw_path: String,
  read_buffer_size: usize,
  io_executor: Arc<WorkerPool>,
  if_modified_since: Option<NaiveDateTime>,
  sink: Option<StreamSink>,
}

impl Debug for StreamingFileHandler {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("StreamingFileHandler({})", self.base_path.display()))
  }
}

impl StreamingFileHandler {
  /// Creates a handler serving files under `base_path`.
  pub fn new(
    base_path: impl Into<PathBuf>,
    read_buffer_size: usize,
    io_executor: Arc<WorkerPool>,
  ) -> Self {
    debug_assert!(
      read_buffer_size > 0 && read_buffer_size <= 1024 * 1024 * 1024,
      "read buffer size must be within (0, 1 GiB]"
    );
    Self {
      id: next_id(),
      base_path: base_path.into(),
      resolved_path: PathBuf::new(),
      raw_path: String::new(),
      read_buffer_size,
      io_executor,
      if_modified_since: None,
      sink: None,
    }
  }

  /// Creates a handler with the default buffer size.
  pub fn with_default_buffer(base_path: impl Into<PathBuf>, io_executor: Arc<WorkerPool>) -> Self {
    Self::new(base_path, DEFAULT_FILE_READER_BUFFER_SIZE, io_executor)
  }

  /// Builds the conventional public-directory mount: a `GET` route whose
  /// single string parameter swallows the whole path.
  pub fn public_directory_route(
    base_path: impl Into<PathBuf>,
    read_buffer_size: usize,
    io_executor: Arc<WorkerPool>,
  ) -> HanamiResult<Route> {
    let base_path = base_path.into();
    Route::streaming("/{{s:.*}}", [Method::Get], move || {
      StreamingFileHandler::new(base_path.clone(), read_buffer_size, Arc::clone(&io_executor))
    })
  }

  /// Resolves `..` and `.` components without ever escaping the base: `..`
  /// pops one accumulated component (popping below the base yields the base),
  /// `.` is a no-op, root and prefix components are discarded.
  pub fn sanitize_path(path: &str) -> PathBuf {
    let mut sanitized = PathBuf::new();
    for component in Path::new(path).components() {
      match component {
        Component::ParentDir => {
          sanitized.pop();
        }
        Component::CurDir => {}
        Component::RootDir | Component::Prefix(_) => {}
        Component::Normal(part) => sanitized.push(part),
      }
    }
    sanitized
  }

  fn send_status_and_eom(&self, status: StatusCode) {
    if let Some(sink) = self.sink.as_ref() {
      sink.send_response_headers(Response::new(status));
      sink.send_end_of_message();
    }
  }
}

// `If-Modified-Since` arrives as `Day, DD Mon YYYY HH:MM:SS` with an optional
// timezone suffix. The weekday name is required but not cross-checked against
// the date, matching what lenient C date parsers accept.
fn parse_if_modified_since(value: &str) -> Option<NaiveDateTime> {
  let (weekday, rest) = value.trim().split_once(", ")?;
  if weekday.is_empty() || !weekday.chars().all(|c| c.is_ascii_alphabetic()) {
    return None;
  }

  let rest = rest.trim().trim_end_matches(" GMT");
  NaiveDateTime::parse_from_str(rest, "%d %b %Y %H:%M:%S").ok()
}

impl StreamingArgs for StreamingFileHandler {
  fn arg_schema() -> Vec<RouteParamType> {
    vec![RouteParamType::String]
  }
}

impl StreamingHandler for StreamingFileHandler {
  fn set_request_args(&mut self, args: PathArgs) {
    self.raw_path = args.string(0).to_string();
  }

  fn on_request_received(&mut self, request: &Request, sink: StreamSink) {
    log::trace!("Request {:x} file handler received {}", self.id, request.path());
    self.sink = Some(sink);
    self.resolved_path = self.base_path.join(Self::sanitize_path(&self.raw_path));

    if let Some(value) = request.header(HeaderName::IfModifiedSince) {
      // An unparseable date just disables the conditional.
      self.if_modified_since = parse_if_modified_since(value);
    }
  }

  fn on_body_chunk(&mut self, _data: &[u8]) {
    log::trace!("Request {:x} file handler ignoring body chunk", self.id);
  }

  fn on_end_of_message(&mut self) {
    if !self.resolved_path.is_file() {
      log::debug!("Request {:x} no regular file at {}", self.id, self.resolved_path.display());
      self.send_status_and_eom(StatusCode::NotFound);
      return;
    }

    let modified = std::fs::metadata(&self.resolved_path)
      .and_then(|meta| meta.modified())
      .ok()
      .map(|mtime| DateTime::<Utc>::from(mtime).naive_utc());

    if let (Some(threshold), Some(modified)) = (self.if_modified_since, modified) {
      if threshold >= modified {
        self.send_status_and_eom(StatusCode::NotModified);
        return;
      }
    }

    let Some(sink) = self.sink.clone() else {
      crate::util::unreachable();
    };
    let path = self.resolved_path.clone();
    let read_buffer_size = self.read_buffer_size;
    let id = self.id;

    self.io_executor.execute(move || {
      let mut file = match File::open(&path) {
        Ok(file) => file,
        Err(error) => {
          log::debug!("Request {:x} cannot open {}: {}", id, path.display(), error);
          sink.send_response_headers(Response::new(StatusCode::NotFound));
          sink.send_end_of_message();
          return;
        }
      };

      sink.send_response_headers(Response::new(StatusCode::OK));

      let mut buffer = vec![0u8; read_buffer_size];
      loop {
        match file.read(&mut buffer) {
          Ok(0) => break,
          Ok(count) => {
            let Some(chunk) = buffer.get(..count) else {
              break;
            };
            sink.send_body_chunk(chunk.to_vec());
          }
          Err(error) => {
            // The headers are out already; the client sees a truncated body.
            log::warn!("Request {:x} error reading {}: {}", id, path.display(), error);
            break;
          }
        }
      }

      sink.send_end_of_message();
    });
  }

  fn on_request_complete(&mut self) {
    log::trace!("Request {:x} file handler complete", self.id);
  }

  fn on_unhandled_error(&mut self, error: &TransportError) {
    log::debug!("Request {:x} file handler transport error: {}", self.id, error);
  }
}
