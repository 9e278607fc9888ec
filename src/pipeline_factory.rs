//! The seam between the transport and the request pipelines.
//!
//! When a request head has been parsed, the transport asks the factory for a
//! pipeline; the factory asks the router, wires the matched handler into a
//! buffered or streaming pipeline, and hands it back for the transport to
//! drive.

use crate::hanami_error::TransportError;
use crate::hanami_router::Router;
use crate::http::headers::Headers;
use crate::http::request::RequestHead;
use crate::timer::Timer;
use crate::util::unwrap_some;
use crate::{
  BufferedPipeline, EventLoopHandle, ServerConfig, StatusCode, StreamingPipeline, WorkerPool,
};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// The write side of one connection, owned by the transport. All calls happen
/// on that connection's response event loop.
pub trait ResponseTransport: Send + Sync {
  /// Sets the status and writes the response headers in iteration order.
  fn send_headers(&self, status: &StatusCode, headers: &Headers);

  /// Writes a span of body bytes.
  fn send_body(&self, data: &[u8]);

  /// Signals the end of the response.
  fn send_eom(&self);
}

/// One request's pipeline, buffered or streaming. The transport drives both
/// shapes through the same five operations.
pub enum RequestPipeline {
  /// The body-accumulating pipeline.
  Buffered(BufferedPipeline),
  /// The chunk-forwarding pipeline.
  Streaming(StreamingPipeline),
}

impl Debug for RequestPipeline {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      RequestPipeline::Buffered(p) => Debug::fmt(p, f),
      RequestPipeline::Streaming(p) => Debug::fmt(p, f),
    }
  }
}

impl RequestPipeline {
  /// The request head has arrived.
  pub fn headers_received(&mut self, head: RequestHead) {
    match self {
      RequestPipeline::Buffered(p) => p.headers_received(head),
      RequestPipeline::Streaming(p) => p.headers_received(head),
    }
  }

  /// One chunk of request body arrived.
  pub fn body_chunk(&mut self, data: &[u8]) {
    match self {
      RequestPipeline::Buffered(p) => p.body_chunk(data),
      RequestPipeline::Streaming(p) => p.body_chunk(data),
    }
  }

  /// The request body is complete.
  pub fn end_of_message(&mut self) {
    match self {
      RequestPipeline::Buffered(p) => p.end_of_message(),
      RequestPipeline::Streaming(p) => p.end_of_message(),
    }
  }

  /// The transport acknowledged the last response byte.
  pub fn request_complete(&mut self) {
    match self {
      RequestPipeline::Buffered(p) => p.request_complete(),
      RequestPipeline::Streaming(p) => p.request_complete(),
    }
  }

  /// A fatal transport error ended the request.
  pub fn transport_error(&mut self, error: TransportError) {
    match self {
      RequestPipeline::Buffered(p) => p.transport_error(),
      RequestPipeline::Streaming(p) => p.transport_error(error),
    }
  }
}

/// Builds a pipeline per request. Created once at server start and shared by
/// every connection.
pub struct PipelineFactory {
  router: Arc<Router>,
  workers: Arc<WorkerPool>,
  timer: Arc<Timer>,
  request_timeout: Duration,
}

impl Debug for PipelineFactory {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("PipelineFactory(timeout={:?})", self.request_timeout))
  }
}

impl PipelineFactory {
  /// Wires the router and executors together with the configured timeout.
  pub fn new(
    config: &ServerConfig,
    router: Arc<Router>,
    workers: Arc<WorkerPool>,
    timer: Arc<Timer>,
  ) -> Self {
    Self { router, workers, timer, request_timeout: config.request_timeout() }
  }

  /// Convenience constructor: sizes a fresh worker pool from the
  /// configuration and spawns the timer thread.
  pub fn with_default_executors(
    config: &ServerConfig,
    router: Arc<Router>,
  ) -> crate::HanamiResult<Self> {
    let workers = Arc::new(WorkerPool::new(config.worker_threads())?);
    let timer = Arc::new(Timer::new()?);
    Ok(Self::new(config, router, workers, timer))
  }

  /// The router in use.
  pub fn router(&self) -> &Arc<Router> {
    &self.router
  }

  /// Chooses and constructs the pipeline for one request. The head is used
  /// for routing only; the pipeline still expects `headers_received` as its
  /// first operation.
  pub fn create(
    &self,
    head: &RequestHead,
    transport: Arc<dyn ResponseTransport>,
    loop_handle: EventLoopHandle,
  ) -> RequestPipeline {
    let matched = self.router.dispatch(head);
    let (callback, streaming) = matched.split();

    if let Some(constructor) = streaming {
      let handler = constructor();
      return RequestPipeline::Streaming(StreamingPipeline::new(handler, transport, loop_handle));
    }

    // Non-matched dispatches carry the router's fallback callback, so this
    // slot is always populated here.
    RequestPipeline::Buffered(BufferedPipeline::new(
      unwrap_some(callback),
      Arc::clone(&self.router),
      transport,
      loop_handle,
      Arc::clone(&self.workers),
      Arc::clone(&self.timer),
      self.request_timeout,
    ))
  }
}
