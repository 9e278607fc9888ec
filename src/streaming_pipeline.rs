//! The streaming request pipeline.
//!
//! Streaming handlers observe body chunks as they arrive and may emit
//! response bytes incrementally, from any thread. Every outward send is
//! posted onto the response event loop, which serializes them and enforces
//! the headers-before-body protocol on its single thread.

use crate::hanami_error::TransportError;
use crate::http::request::{BodyChain, Request, RequestHead};
use crate::pipeline_factory::ResponseTransport;
use crate::route_pattern::{PathArgs, RouteParamType};
use crate::util::next_id;
use crate::{EventLoopHandle, Response};
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A handler that is driven through the streaming request lifecycle.
///
/// Inbound calls arrive in this order, all on the response event loop:
/// `set_request_args` (from the dispatch path, before the pipeline runs) →
/// `on_request_received` → zero or more `on_body_chunk` →
/// `on_end_of_message` → `on_request_complete` (after the response is fully
/// written). `on_unhandled_error` may replace the tail at any point after
/// `on_request_received`.
pub trait StreamingHandler: Send {
  /// Receives the typed parameters extracted from the route pattern.
  fn set_request_args(&mut self, args: PathArgs);

  /// The request head has arrived. The sink stays valid for the lifetime of
  /// the handler and may be cloned onto other threads.
  fn on_request_received(&mut self, request: &Request, sink: StreamSink);

  /// One chunk of the request body, in arrival order.
  fn on_body_chunk(&mut self, data: &[u8]);

  /// The request body is complete.
  fn on_end_of_message(&mut self);

  /// The transport has acknowledged the last response byte.
  fn on_request_complete(&mut self);

  /// A fatal transport error ended the request early.
  fn on_unhandled_error(&mut self, error: &TransportError);
}

/// The reflected parameter schema of a streaming handler type, cross-checked
/// against the route pattern at construction.
pub trait StreamingArgs {
  /// The parameter types `set_request_args` expects, in order.
  fn arg_schema() -> Vec<RouteParamType>;
}

pub(crate) trait ErasedStreamingFactory: Send + Sync {
  fn schema(&self) -> Vec<RouteParamType>;
  fn create(&self) -> Box<dyn StreamingHandler>;
}

pub(crate) struct FnStreamingFactory<F, H> {
  pub(crate) factory: F,
  pub(crate) _handler: PhantomData<fn() -> H>,
}

impl<F, H> ErasedStreamingFactory for FnStreamingFactory<F, H>
where
  F: Fn() -> H + Send + Sync,
  H: StreamingHandler + StreamingArgs + 'static,
{
  fn schema(&self) -> Vec<RouteParamType> {
    H::arg_schema()
  }

  fn create(&self) -> Box<dyn StreamingHandler> {
    Box::new((self.factory)())
  }
}

struct SinkShared {
  transport: Arc<dyn ResponseTransport>,
  loop_handle: EventLoopHandle,
  // Only read and written from tasks on the response loop.
  headers_sent: AtomicBool,
  id: u128,
}

/// The outward half of the streaming lifecycle. Cloneable and callable from
/// any thread; every call posts its work onto the response event loop, so two
/// concurrent sends are serialized and observed in posting order.
#[derive(Clone)]
pub struct StreamSink {
  shared: Arc<SinkShared>,
}

impl Debug for StreamSink {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("StreamSink({:x})", self.shared.id))
  }
}

impl StreamSink {
  pub(crate) fn new(
    transport: Arc<dyn ResponseTransport>,
    loop_handle: EventLoopHandle,
    id: u128,
  ) -> Self {
    Self {
      shared: Arc::new(SinkShared {
        transport,
        loop_handle,
        headers_sent: AtomicBool::new(false),
        id,
      }),
    }
  }

  /// Dispatches the response head (and any body bytes already attached to the
  /// response). Must be called exactly once, before any body chunk.
  pub fn send_response_headers(&self, response: Response) {
    let shared = Arc::clone(&self.shared);
    self.shared.loop_handle.post(move || {
      if shared.headers_sent.swap(true, Ordering::SeqCst) {
        log::warn!("Request {:x} sent response headers more than once, dropping", shared.id);
        return;
      }
      shared.transport.send_headers(&response.status_code, &response.headers);
      if !response.body.is_empty() {
        shared.transport.send_body(&response.body);
      }
    });
  }

  /// Dispatches one chunk of response body. Empty chunks are dropped.
  pub fn send_body_chunk(&self, data: Vec<u8>) {
    if data.is_empty() {
      return;
    }
    let shared = Arc::clone(&self.shared);
    self.shared.loop_handle.post(move || {
      if !shared.headers_sent.load(Ordering::SeqCst) {
        log::warn!("Request {:x} sent a body chunk before response headers, dropping", shared.id);
        return;
      }
      shared.transport.send_body(&data);
    });
  }

  /// Dispatches the end of the response. After this, further sends are
  /// undefined and get dropped.
  pub fn send_end_of_message(&self) {
    let shared = Arc::clone(&self.shared);
    self.shared.loop_handle.post(move || {
      if !shared.headers_sent.load(Ordering::SeqCst) {
        log::warn!(
          "Request {:x} sent end-of-message before response headers, dropping",
          shared.id
        );
        return;
      }
      shared.transport.send_eom();
    });
  }
}

/// Drives one streaming handler through the request lifecycle. The transport
/// calls the inbound operations from the response event loop; the pipeline
/// owns the handler and serializes its destruction after all in-flight sends.
pub struct StreamingPipeline {
  id: u128,
  handler: Option<Box<dyn StreamingHandler>>,
  sink: StreamSink,
  loop_handle: EventLoopHandle,
  received: bool,
}

impl Debug for StreamingPipeline {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("StreamingPipeline({:x})", self.id))
  }
}

impl StreamingPipeline {
  /// Wraps an already-constructed handler. `set_request_args` has run by the
  /// time the handler gets here.
  pub fn new(
    handler: Box<dyn StreamingHandler>,
    transport: Arc<dyn ResponseTransport>,
    loop_handle: EventLoopHandle,
  ) -> Self {
    let id = next_id();
    Self {
      id,
      handler: Some(handler),
      sink: StreamSink::new(transport, loop_handle.clone(), id),
      loop_handle,
      received: false,
    }
  }

  /// The request head has arrived.
  pub fn headers_received(&mut self, head: RequestHead) {
    if self.received {
      log::warn!("Request {:x} delivered headers twice, ignoring", self.id);
      return;
    }
    self.received = true;

    let request = Request::new(head, BodyChain::new());
    let sink = self.sink.clone();
    if let Some(handler) = self.handler.as_mut() {
      handler.on_request_received(&request, sink);
    }
  }

  /// One chunk of request body arrived.
  pub fn body_chunk(&mut self, data: &[u8]) {
    if !self.received {
      log::warn!("Request {:x} delivered a body chunk before headers, ignoring", self.id);
      return;
    }
    if let Some(handler) = self.handler.as_mut() {
      handler.on_body_chunk(data);
    }
  }

  /// The request body is complete.
  pub fn end_of_message(&mut self) {
    if !self.received {
      log::warn!("Request {:x} delivered end-of-message before headers, ignoring", self.id);
      return;
    }
    if let Some(handler) = self.handler.as_mut() {
      handler.on_end_of_message();
    }
  }

  /// The transport acknowledged the last response byte. Releases the handler.
  pub fn request_complete(&mut self) {
    if let Some(handler) = self.handler.as_mut() {
      handler.on_request_complete();
    }
    self.release();
  }

  /// A fatal transport error ended the request. Releases the handler.
  pub fn transport_error(&mut self, error: TransportError) {
    if let Some(handler) = self.handler.as_mut() {
      handler.on_unhandled_error(&error);
    }
    self.release();
  }

  // Destruction is posted onto the response loop so it lands after every
  // outward send that is already in flight for this request.
  fn release(&mut self) {
    if let Some(handler) = self.handler.take() {
      self.loop_handle.post(move || drop(handler));
    }
  }
}
