#![allow(dead_code)]

use hanami::{EventLoop, Headers, Method, Request, RequestHead, ResponseTransport, StatusCode};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A transport double that records everything the pipeline writes.
#[derive(Default)]
pub struct RecordingTransport {
  messages: Mutex<Vec<(u16, Headers)>>,
  bodies: Mutex<Vec<Vec<u8>>>,
  eom_calls: AtomicUsize,
}

impl RecordingTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn statuses(&self) -> Vec<u16> {
    self.messages.lock().expect("lock").iter().map(|(status, _)| *status).collect()
  }

  pub fn message_count(&self) -> usize {
    self.messages.lock().expect("lock").len()
  }

  pub fn header(&self, message: usize, name: &str) -> Option<String> {
    let messages = self.messages.lock().expect("lock");
    let (_, headers) = messages.get(message)?;
    headers.get(name).map(str::to_string)
  }

  pub fn body_count(&self) -> usize {
    self.bodies.lock().expect("lock").len()
  }

  pub fn body_as_string(&self, index: usize) -> String {
    let bodies = self.bodies.lock().expect("lock");
    String::from_utf8_lossy(bodies.get(index).expect("body index")).into_owned()
  }

  pub fn collected_body(&self) -> String {
    let bodies = self.bodies.lock().expect("lock");
    let mut out = String::new();
    for body in bodies.iter() {
      out.push_str(&String::from_utf8_lossy(body));
    }
    out
  }

  pub fn eom_calls(&self) -> usize {
    self.eom_calls.load(Ordering::SeqCst)
  }
}

impl ResponseTransport for RecordingTransport {
  fn send_headers(&self, status: &StatusCode, headers: &Headers) {
    self.messages.lock().expect("lock").push((status.code(), headers.clone()));
  }

  fn send_body(&self, data: &[u8]) {
    self.bodies.lock().expect("lock").push(data.to_vec());
  }

  fn send_eom(&self) {
    self.eom_calls.fetch_add(1, Ordering::SeqCst);
  }
}

pub fn make_head(method: Method, target: &str) -> RequestHead {
  RequestHead::new(method, target, Headers::new())
}

pub fn make_head_with_headers<'a>(
  method: Method,
  target: &str,
  headers: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> RequestHead {
  RequestHead::new(method, target, headers.into_iter().collect())
}

pub fn make_request(method: Method, target: &str) -> Request {
  Request::new(make_head(method, target), Default::default())
}

/// Drains the event loop until the predicate holds or the timeout elapses.
pub fn drive_until(
  event_loop: &EventLoop,
  timeout: Duration,
  mut pred: impl FnMut() -> bool,
) -> bool {
  let deadline = Instant::now() + timeout;
  loop {
    event_loop.drain();
    if pred() {
      return true;
    }
    if Instant::now() >= deadline {
      return false;
    }
    std::thread::sleep(Duration::from_millis(2));
  }
}

static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A throwaway directory removed again on drop.
pub struct TempDir {
  pub path: PathBuf,
}

impl TempDir {
  pub fn new() -> Self {
    let path = std::env::temp_dir().join(format!(
      "hanami-test-{}-{}",
      std::process::id(),
      TEMP_DIR_COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&path).expect("create temp dir");
    Self { path }
  }

  pub fn file(&self, name: &str, contents: &str) -> PathBuf {
    let path = self.path.join(name);
    std::fs::write(&path, contents).expect("write temp file");
    path
  }
}

impl Drop for TempDir {
  fn drop(&mut self) {
    let _ = std::fs::remove_dir_all(&self.path);
  }
}
