use hanami::{
  EventLoop, Method, PathArgs, Request, Response, RouteParamType, Router, RouterBuilder,
  StreamSink, StreamingArgs, StreamingHandler, StreamingPipeline, TransportError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod common;
use common::{drive_until, make_head, RecordingTransport};

#[derive(Clone, Copy, PartialEq)]
enum Mode {
  // Echo every request body chunk back out after sending headers on EOM.
  Echo,
  // Exercise the sink protocol violations on EOM.
  Misbehave,
  // Do nothing on EOM.
  Silent,
}

struct ProbeHandler {
  events: Arc<Mutex<Vec<String>>>,
  chunks: Arc<Mutex<Vec<Vec<u8>>>>,
  sink: Option<StreamSink>,
  mode: Mode,
  dropped: Arc<AtomicBool>,
}

impl ProbeHandler {
  fn new(
    events: Arc<Mutex<Vec<String>>>,
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    mode: Mode,
    dropped: Arc<AtomicBool>,
  ) -> Self {
    Self { events, chunks, sink: None, mode, dropped }
  }

  fn record(&self, event: impl Into<String>) {
    self.events.lock().expect("lock").push(event.into());
  }
}

impl Drop for ProbeHandler {
  fn drop(&mut self) {
    self.dropped.store(true, Ordering::SeqCst);
  }
}

impl StreamingArgs for ProbeHandler {
  fn arg_schema() -> Vec<RouteParamType> {
    vec![RouteParamType::Int64, RouteParamType::String]
  }
}

impl StreamingHandler for ProbeHandler {
  fn set_request_args(&mut self, args: PathArgs) {
    self.record(format!("args({},{})", args.int(0), args.string(1)));
  }

  fn on_request_received(&mut self, request: &Request, sink: StreamSink) {
    self.record(format!("received {}", request.path()));
    self.sink = Some(sink);
  }

  fn on_body_chunk(&mut self, data: &[u8]) {
    self.record(format!("chunk({})", String::from_utf8_lossy(data)));
    self.chunks.lock().expect("lock").push(data.to_vec());
  }

  fn on_end_of_message(&mut self) {
    self.record("eom");
    let sink = self.sink.clone().expect("sink");
    match self.mode {
      Mode::Echo => {
        sink.send_response_headers(Response::new(200));
        for chunk in self.chunks.lock().expect("lock").iter() {
          sink.send_body_chunk(chunk.clone());
        }
        sink.send_end_of_message();
      }
      Mode::Misbehave => {
        // Body and EOM before headers must be suppressed.
        sink.send_body_chunk(b"early".to_vec());
        sink.send_end_of_message();
        sink.send_response_headers(Response::from_string(200, "head"));
        // Empty chunks are dropped, duplicate headers are suppressed.
        sink.send_body_chunk(Vec::new());
        sink.send_body_chunk(b"ok".to_vec());
        sink.send_response_headers(Response::new(500));
        sink.send_end_of_message();
      }
      Mode::Silent => {}
    }
  }

  fn on_request_complete(&mut self) {
    self.record("complete");
  }

  fn on_unhandled_error(&mut self, error: &TransportError) {
    self.record(format!("error({error})"));
  }
}

struct Probe {
  events: Arc<Mutex<Vec<String>>>,
  dropped: Arc<AtomicBool>,
  router: Router,
}

fn probe_router(mode: Mode) -> Probe {
  let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
  let chunks: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
  let dropped = Arc::new(AtomicBool::new(false));

  let factory_events = Arc::clone(&events);
  let factory_chunks = Arc::clone(&chunks);
  let factory_dropped = Arc::clone(&dropped);
  let router = RouterBuilder::new()
    .streaming_route(r"/{{i}}/{{s:\w+}}", [Method::Get], move || {
      ProbeHandler::new(
        Arc::clone(&factory_events),
        Arc::clone(&factory_chunks),
        mode,
        Arc::clone(&factory_dropped),
      )
    })
    .expect("route")
    .build();

  Probe { events, dropped, router }
}

fn events_of(probe: &Probe) -> Vec<String> {
  probe.events.lock().expect("lock").clone()
}

#[test]
fn drives_the_streaming_lifecycle_in_order() {
  let probe = probe_router(Mode::Echo);
  let event_loop = EventLoop::new();
  let transport = Arc::new(RecordingTransport::new());

  let head = make_head(Method::Get, "/5/abc");
  let handler =
    probe.router.dispatch(&head).into_streaming_handler().expect("streaming handler");
  let mut pipeline = StreamingPipeline::new(
    handler,
    Arc::clone(&transport) as Arc<dyn hanami::ResponseTransport>,
    event_loop.handle(),
  );

  pipeline.headers_received(head);
  pipeline.body_chunk(b"hello ");
  pipeline.body_chunk(b"world");
  pipeline.end_of_message();
  event_loop.drain();
  pipeline.request_complete();
  event_loop.drain();

  assert_eq!(
    events_of(&probe),
    vec![
      "args(5,abc)".to_string(),
      "received /5/abc".to_string(),
      "chunk(hello )".to_string(),
      "chunk(world)".to_string(),
      "eom".to_string(),
      "complete".to_string(),
    ]
  );

  assert_eq!(transport.statuses(), vec![200]);
  assert_eq!(transport.collected_body(), "hello world");
  assert_eq!(transport.eom_calls(), 1);
}

#[test]
fn sink_enforces_the_send_protocol_on_the_loop() {
  let probe = probe_router(Mode::Misbehave);
  let event_loop = EventLoop::new();
  let transport = Arc::new(RecordingTransport::new());

  let head = make_head(Method::Get, "/1/x");
  let handler =
    probe.router.dispatch(&head).into_streaming_handler().expect("streaming handler");
  let mut pipeline = StreamingPipeline::new(
    handler,
    Arc::clone(&transport) as Arc<dyn hanami::ResponseTransport>,
    event_loop.handle(),
  );

  pipeline.headers_received(head);
  pipeline.end_of_message();
  event_loop.drain();

  // Only the first headers made it out, one real chunk, one EOM.
  assert_eq!(transport.statuses(), vec![200]);
  assert_eq!(transport.body_count(), 2);
  assert_eq!(transport.body_as_string(0), "head");
  assert_eq!(transport.body_as_string(1), "ok");
  assert_eq!(transport.eom_calls(), 1);
}

#[test]
fn concurrent_sends_are_serialized_by_the_loop() {
  let event_loop = EventLoop::new();
  let transport = Arc::new(RecordingTransport::new());
  let sink = hanami_sink_for_test(&event_loop, &transport);

  sink.send_response_headers(Response::new(200));

  let mut joins = Vec::new();
  for n in 0..4 {
    let sink = sink.clone();
    joins.push(std::thread::spawn(move || {
      for i in 0..50 {
        sink.send_body_chunk(format!("{n}:{i};").into_bytes());
      }
    }));
  }
  for join in joins {
    join.join().expect("join");
  }
  sink.send_end_of_message();
  event_loop.drain();

  assert_eq!(transport.statuses(), vec![200]);
  assert_eq!(transport.body_count(), 200);
  assert_eq!(transport.eom_calls(), 1);
}

// The sink is only handed out through a pipeline, so route a throwaway
// handler to get one wired to this loop and transport.
fn hanami_sink_for_test(event_loop: &EventLoop, transport: &Arc<RecordingTransport>) -> StreamSink {
  struct SinkGrabber(Arc<Mutex<Option<StreamSink>>>);
  impl StreamingArgs for SinkGrabber {
    fn arg_schema() -> Vec<RouteParamType> {
      Vec::new()
    }
  }
  impl StreamingHandler for SinkGrabber {
    fn set_request_args(&mut self, _args: PathArgs) {}
    fn on_request_received(&mut self, _request: &Request, sink: StreamSink) {
      *self.0.lock().expect("lock") = Some(sink);
    }
    fn on_body_chunk(&mut self, _data: &[u8]) {}
    fn on_end_of_message(&mut self) {}
    fn on_request_complete(&mut self) {}
    fn on_unhandled_error(&mut self, _error: &TransportError) {}
  }

  let slot: Arc<Mutex<Option<StreamSink>>> = Arc::new(Mutex::new(None));
  let mut pipeline = StreamingPipeline::new(
    Box::new(SinkGrabber(Arc::clone(&slot))),
    Arc::clone(transport) as Arc<dyn hanami::ResponseTransport>,
    event_loop.handle(),
  );
  pipeline.headers_received(make_head(Method::Get, "/"));
  let sink = slot.lock().expect("lock").clone().expect("sink");
  // Keep the handler alive long enough; dropping the pipeline posts its
  // destruction, which is harmless here.
  pipeline.request_complete();
  sink
}

#[test]
fn destruction_is_posted_onto_the_loop() {
  let probe = probe_router(Mode::Silent);
  let event_loop = EventLoop::new();
  let transport = Arc::new(RecordingTransport::new());

  let head = make_head(Method::Get, "/1/x");
  let handler =
    probe.router.dispatch(&head).into_streaming_handler().expect("streaming handler");
  let mut pipeline = StreamingPipeline::new(
    handler,
    Arc::clone(&transport) as Arc<dyn hanami::ResponseTransport>,
    event_loop.handle(),
  );

  pipeline.headers_received(head);
  pipeline.end_of_message();
  pipeline.request_complete();

  // The handler is released only when the loop runs the posted destruction,
  // after every in-flight send.
  assert!(!probe.dropped.load(Ordering::SeqCst));
  event_loop.drain();
  assert!(probe.dropped.load(Ordering::SeqCst));

  let events = events_of(&probe);
  assert_eq!(events.last().map(String::as_str), Some("complete"));
}

#[test]
fn transport_errors_reach_the_handler_and_release_it() {
  let probe = probe_router(Mode::Silent);
  let event_loop = EventLoop::new();
  let transport = Arc::new(RecordingTransport::new());

  let head = make_head(Method::Get, "/1/x");
  let handler =
    probe.router.dispatch(&head).into_streaming_handler().expect("streaming handler");
  let mut pipeline = StreamingPipeline::new(
    handler,
    Arc::clone(&transport) as Arc<dyn hanami::ResponseTransport>,
    event_loop.handle(),
  );

  pipeline.headers_received(head);
  pipeline.transport_error(TransportError::ConnectionReset);
  event_loop.drain();

  assert!(probe.dropped.load(Ordering::SeqCst));
  let events = events_of(&probe);
  assert_eq!(events.last().map(String::as_str), Some("error(connection reset)"));
  assert_eq!(transport.eom_calls(), 0);
}

#[test]
fn streaming_handlers_never_see_events_before_the_head() {
  let probe = probe_router(Mode::Silent);
  let event_loop = EventLoop::new();
  let transport = Arc::new(RecordingTransport::new());

  let head = make_head(Method::Get, "/1/x");
  let handler =
    probe.router.dispatch(&head).into_streaming_handler().expect("streaming handler");
  let mut pipeline = StreamingPipeline::new(
    handler,
    Arc::clone(&transport) as Arc<dyn hanami::ResponseTransport>,
    event_loop.handle(),
  );

  pipeline.body_chunk(b"early");
  pipeline.end_of_message();
  pipeline.headers_received(head);
  event_loop.drain();

  assert_eq!(
    events_of(&probe),
    vec!["args(1,x)".to_string(), "received /1/x".to_string()]
  );

  drop(pipeline);
  let _ = drive_until(&event_loop, Duration::from_millis(100), || {
    probe.dropped.load(Ordering::SeqCst)
  });
}
