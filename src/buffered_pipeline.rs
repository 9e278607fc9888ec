//! The buffered request pipeline.
//!
//! The default path for handlers that want the whole request body in memory
//! and produce a single response. The pipeline accumulates the body, runs the
//! handler on the worker pool under a timeout, and emits exactly one response
//! on the response event loop - the handler's, a fallback's, or a synthesized
//! one.

use crate::hanami_router::Router;
use crate::http::request::{BodyChain, Request, RequestHead};
use crate::pipeline_factory::ResponseTransport;
use crate::route::RequestCallback;
use crate::timer::{Timer, TimerToken};
use crate::util::{next_id, panic_msg, unwrap_poison};
use crate::{EventLoopHandle, HanamiError, Response, WorkerPool};
use std::fmt::{Debug, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PipelineState {
  AwaitingHeaders,
  AccumulatingBody,
  Dispatched,
  ResponseReady,
  Closed,
}

enum Outcome {
  Success(Response),
  HandlerError(HanamiError),
  TimedOut,
}

struct DispatchShared {
  id: u128,
  settled: Mutex<bool>,
  state: Arc<Mutex<PipelineState>>,
  request: Arc<Request>,
  router: Arc<Router>,
  transport: Arc<dyn ResponseTransport>,
  loop_handle: EventLoopHandle,
  workers: Arc<WorkerPool>,
  timer: Arc<Timer>,
  timer_token: Mutex<Option<TimerToken>>,
}

/// Drives one buffered request from header receipt to response emission.
/// The transport owns the pipeline and calls the inbound operations from the
/// response event loop.
pub struct BufferedPipeline {
  id: u128,
  state: Arc<Mutex<PipelineState>>,
  head: Option<RequestHead>,
  body: BodyChain,
  callback: Option<RequestCallback>,
  router: Arc<Router>,
  transport: Arc<dyn ResponseTransport>,
  loop_handle: EventLoopHandle,
  workers: Arc<WorkerPool>,
  timer: Arc<Timer>,
  timeout: Duration,
}

impl Debug for BufferedPipeline {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("BufferedPipeline({:x})", self.id))
  }
}

impl BufferedPipeline {
  /// Creates the pipeline around the callback the router matched.
  #[allow(clippy::too_many_arguments)] // Only called by the factory.
  pub fn new(
    callback: RequestCallback,
    router: Arc<Router>,
    transport: Arc<dyn ResponseTransport>,
    loop_handle: EventLoopHandle,
    workers: Arc<WorkerPool>,
    timer: Arc<Timer>,
    timeout: Duration,
  ) -> Self {
    Self {
      id: next_id(),
      state: Arc::new(Mutex::new(PipelineState::AwaitingHeaders)),
      head: None,
      body: BodyChain::new(),
      callback: Some(callback),
      router,
      transport,
      loop_handle,
      workers,
      timer,
      timeout,
    }
  }

  fn state(&self) -> PipelineState {
    unwrap_poison(self.state.lock()).map(|s| *s).unwrap_or(PipelineState::Closed)
  }

  fn set_state(&self, next: PipelineState) {
    if let Ok(mut state) = unwrap_poison(self.state.lock()) {
      *state = next;
    }
  }

  /// The request head has arrived. Must be called exactly once.
  pub fn headers_received(&mut self, head: RequestHead) {
    if self.state() != PipelineState::AwaitingHeaders {
      log::warn!("Request {:x} delivered headers in state {:?}, ignoring", self.id, self.state());
      return;
    }
    self.head = Some(head);
    self.set_state(PipelineState::AccumulatingBody);
  }

  /// One chunk of request body arrived. Valid zero or more times. No per-chunk
  /// cap is enforced here; backpressure is the transport's responsibility.
  pub fn body_chunk(&mut self, data: &[u8]) {
    if self.state() != PipelineState::AccumulatingBody {
      log::warn!(
        "Request {:x} delivered a body chunk in state {:?}, ignoring",
        self.id,
        self.state()
      );
      return;
    }
    self.body.append(data.to_vec());
  }

  /// The request body is complete: seal it, submit the handler to the worker
  /// pool and arm the request timeout. Whichever of handler-complete,
  /// handler-error and timeout fires first wins; the others are discarded.
  pub fn end_of_message(&mut self) {
    if self.state() != PipelineState::AccumulatingBody {
      log::warn!(
        "Request {:x} delivered end-of-message in state {:?}, ignoring",
        self.id,
        self.state()
      );
      return;
    }

    let (Some(head), Some(callback)) = (self.head.take(), self.callback.take()) else {
      crate::util::unreachable();
    };
    let body = std::mem::take(&mut self.body);
    self.set_state(PipelineState::Dispatched);

    let shared = Arc::new(DispatchShared {
      id: self.id,
      settled: Mutex::new(false),
      state: Arc::clone(&self.state),
      request: Arc::new(Request::new(head, body)),
      router: Arc::clone(&self.router),
      transport: Arc::clone(&self.transport),
      loop_handle: self.loop_handle.clone(),
      workers: Arc::clone(&self.workers),
      timer: Arc::clone(&self.timer),
      timer_token: Mutex::new(None),
    });

    let timeout_shared = Arc::clone(&shared);
    let token = self.timer.schedule(self.timeout, move || {
      settle(&timeout_shared, Outcome::TimedOut);
    });
    if let Ok(mut slot) = unwrap_poison(shared.timer_token.lock()) {
      *slot = Some(token);
    }

    let worker_shared = Arc::clone(&shared);
    self.workers.execute(move || {
      let request = Arc::clone(&worker_shared.request);
      let outcome = match catch_unwind(AssertUnwindSafe(move || callback(request.as_ref()))) {
        Ok(Ok(response)) => Outcome::Success(response),
        Ok(Err(error)) => Outcome::HandlerError(error),
        Err(panic) => panic_msg(panic, |msg| {
          Outcome::HandlerError(HanamiError::msg(format!("handler panicked: {msg}")))
        }),
      };
      settle(&worker_shared, outcome);
    });
  }

  /// A fatal transport error. Releases pipeline state; no response is
  /// emitted.
  pub fn transport_error(&mut self) {
    self.set_state(PipelineState::Closed);
    self.head = None;
    self.callback = None;
    self.body = BodyChain::new();
  }

  /// The transport acknowledged the last response byte. Releases pipeline
  /// state.
  pub fn request_complete(&mut self) {
    self.set_state(PipelineState::Closed);
    self.head = None;
    self.callback = None;
    self.body = BodyChain::new();
  }
}

// First caller wins; the race between handler outcome and timeout is decided
// here. Fallback resolution runs on the worker pool (user code), emission on
// the response loop.
fn settle(shared: &Arc<DispatchShared>, outcome: Outcome) {
  {
    let Ok(mut settled) = unwrap_poison(shared.settled.lock()) else {
      return;
    };
    if *settled {
      return;
    }
    *settled = true;
  }

  if !matches!(outcome, Outcome::TimedOut) {
    if let Ok(mut token) = unwrap_poison(shared.timer_token.lock()) {
      if let Some(token) = token.take() {
        shared.timer.cancel(token);
      }
    }
  }

  let resolve_shared = Arc::clone(shared);
  shared.workers.execute(move || {
    let response = resolve(&resolve_shared, outcome);
    let emit_shared = Arc::clone(&resolve_shared);
    resolve_shared.loop_handle.post(move || emit(&emit_shared, response));
  });
}

fn resolve(shared: &Arc<DispatchShared>, outcome: Outcome) -> Response {
  match outcome {
    Outcome::Success(response) => response,
    Outcome::HandlerError(error) => {
      log::error!(
        "Request {:x} handler error {} {}: {}",
        shared.id,
        shared.request.method(),
        shared.request.path(),
        error
      );
      fallback_response(shared, 500)
    }
    Outcome::TimedOut => {
      log::warn!(
        "Request {:x} timed out {} {}",
        shared.id,
        shared.request.method(),
        shared.request.path()
      );
      fallback_response(shared, 503)
    }
  }
}

fn fallback_response(shared: &Arc<DispatchShared>, status: u16) -> Response {
  match shared.router.error_handler(status).handle(shared.request.as_ref()) {
    Ok(response) => response,
    Err(error) => {
      log::error!("Request {:x} fallback handler for {} failed: {}", shared.id, status, error);
      Response::from_string(500, "Unknown error")
    }
  }
}

fn emit(shared: &Arc<DispatchShared>, response: Response) {
  if let Ok(mut state) = unwrap_poison(shared.state.lock()) {
    if *state == PipelineState::Closed {
      // The transport died while the handler ran; nowhere to write to.
      return;
    }
    *state = PipelineState::ResponseReady;
  }

  shared.transport.send_headers(&response.status_code, &response.headers);
  shared.transport.send_body(&response.body);
  shared.transport.send_eom();
}
