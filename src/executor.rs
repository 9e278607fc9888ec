//! The two scheduling primitives of the request lifecycle: the per-connection
//! response event loop and the I/O worker pool.
//!
//! All transport-visible writes happen from tasks on the event loop, which is
//! drained by exactly one thread. Handler code runs on the worker pool and may
//! block; results are posted back onto the loop.

use crate::hanami_error::ConfigError;
use crate::util::{panic_msg, unwrap_ok, unwrap_poison};
use crate::HanamiResult;
use once_cell::sync::Lazy;
use std::fmt::{Debug, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce() + Send>;

/// A single-threaded cooperative task queue. Any thread may post tasks
/// through an [`EventLoopHandle`]; the owner drains them on one thread, so
/// tasks never run concurrently with each other and run in posting order.
pub struct EventLoop {
  receiver: Receiver<Task>,
  handle: EventLoopHandle,
}

/// A cloneable handle used to post tasks onto an [`EventLoop`].
#[derive(Clone)]
pub struct EventLoopHandle {
  sender: Sender<Task>,
}

impl Debug for EventLoopHandle {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str("EventLoopHandle")
  }
}

impl EventLoopHandle {
  /// Posts a task. Posting never blocks. If the loop is gone the task is
  /// silently dropped, which mirrors a connection that went away.
  pub fn post(&self, task: impl FnOnce() + Send + 'static) {
    let _ = self.sender.send(Box::new(task));
  }
}

impl Default for EventLoop {
  fn default() -> Self {
    Self::new()
  }
}

impl EventLoop {
  /// Creates a fresh loop.
  pub fn new() -> Self {
    let (sender, receiver) = mpsc::channel();
    Self { receiver, handle: EventLoopHandle { sender } }
  }

  /// Returns a handle for posting tasks.
  pub fn handle(&self) -> EventLoopHandle {
    self.handle.clone()
  }

  /// Runs every task currently queued and returns how many ran. Tasks posted
  /// by the tasks themselves are run too.
  pub fn drain(&self) -> usize {
    let mut count = 0;
    loop {
      match self.receiver.try_recv() {
        Ok(task) => {
          run_task(task);
          count += 1;
        }
        Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return count,
      }
    }
  }

  /// Runs tasks as they arrive until `duration` has elapsed. Returns how many
  /// tasks ran.
  pub fn run_for(&self, duration: Duration) -> usize {
    let deadline = Instant::now() + duration;
    let mut count = 0;
    loop {
      let now = Instant::now();
      if now >= deadline {
        return count;
      }
      match self.receiver.recv_timeout(deadline - now) {
        Ok(task) => {
          run_task(task);
          count += 1;
        }
        Err(_) => return count,
      }
    }
  }
}

fn run_task(task: Task) {
  if let Err(panic) = catch_unwind(AssertUnwindSafe(task)) {
    panic_msg(panic, |msg| log::error!("Event loop task panicked: {}", msg));
  }
}

/// A fixed-size pool of threads that run user handler code. Handler code may
/// block on file or remote I/O; concurrent handlers run in parallel.
pub struct WorkerPool {
  sender: Option<Sender<Task>>,
  threads: Vec<JoinHandle<()>>,
}

impl Debug for WorkerPool {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("WorkerPool(threads={})", self.threads.len()))
  }
}

impl WorkerPool {
  /// Spawns a pool with the given number of threads. The count must be
  /// greater than zero.
  pub fn new(threads: usize) -> HanamiResult<Self> {
    if threads == 0 {
      return Err(ConfigError::ZeroWorkerThreads.into());
    }

    let (sender, receiver) = mpsc::channel::<Task>();
    let receiver = Arc::new(Mutex::new(receiver));

    let mut handles = Vec::with_capacity(threads);
    for n in 0..threads {
      let receiver = Arc::clone(&receiver);
      let handle = thread::Builder::new()
        .name(format!("hanami-worker-{n}"))
        .spawn(move || worker_main(receiver))?;
      handles.push(handle);
    }

    Ok(Self { sender: Some(sender), threads: handles })
  }

  /// Submits a task. Tasks are picked up by the first idle worker.
  pub fn execute(&self, task: impl FnOnce() + Send + 'static) {
    if let Some(sender) = self.sender.as_ref() {
      let _ = sender.send(Box::new(task));
    }
  }
}

fn worker_main(receiver: Arc<Mutex<Receiver<Task>>>) {
  loop {
    let task = {
      let guard = match unwrap_poison(receiver.lock()) {
        Ok(guard) => guard,
        Err(_) => return,
      };
      guard.recv()
    };

    match task {
      Ok(task) => run_task(task),
      Err(_) => return,
    }
  }
}

impl Drop for WorkerPool {
  fn drop(&mut self) {
    // Closing the channel lets the workers run down their queue and exit.
    drop(self.sender.take());
    for handle in self.threads.drain(..) {
      let _ = handle.join();
    }
  }
}

static GLOBAL_IO_POOL: Lazy<Arc<WorkerPool>> = Lazy::new(|| {
  let threads = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
  Arc::new(unwrap_ok(WorkerPool::new(threads)))
});

/// The lazily-created process-global I/O worker pool. A convenience default;
/// everything that needs a pool also accepts one explicitly.
pub fn global_io_pool() -> Arc<WorkerPool> {
  Arc::clone(&GLOBAL_IO_POOL)
}
