//! Deadline scheduling for request timeouts.

use crate::util::{panic_msg, unwrap_poison};
use crate::HanamiResult;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Debug, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce() + Send>;

/// Identifies one scheduled deadline so it can be cancelled.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TimerToken(u64);

struct TimerState {
  // Keyed by (deadline, token) so the first entry is always the next due one.
  tasks: BTreeMap<(Instant, u64), Task>,
  deadlines: HashMap<u64, Instant>,
  next_token: u64,
  shutdown: bool,
}

struct TimerShared {
  state: Mutex<TimerState>,
  condvar: Condvar,
}

/// A single shared deadline thread. Tasks run on that thread when their
/// deadline passes, so they must hand real work off to an executor promptly.
pub struct Timer {
  shared: Arc<TimerShared>,
  thread: Option<JoinHandle<()>>,
}

impl Debug for Timer {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str("Timer")
  }
}

impl Timer {
  /// Spawns the deadline thread.
  pub fn new() -> HanamiResult<Self> {
    let shared = Arc::new(TimerShared {
      state: Mutex::new(TimerState {
        tasks: BTreeMap::new(),
        deadlines: HashMap::new(),
        next_token: 0,
        shutdown: false,
      }),
      condvar: Condvar::new(),
    });

    let thread_shared = Arc::clone(&shared);
    let thread =
      thread::Builder::new().name("hanami-timer".to_string()).spawn(move || timer_main(thread_shared))?;

    Ok(Self { shared, thread: Some(thread) })
  }

  /// Schedules `task` to run once `delay` has elapsed.
  pub fn schedule(&self, delay: Duration, task: impl FnOnce() + Send + 'static) -> TimerToken {
    let deadline = Instant::now() + delay;
    let token = {
      let Ok(mut state) = unwrap_poison(self.shared.state.lock()) else {
        return TimerToken(u64::MAX);
      };
      let token = state.next_token;
      state.next_token += 1;
      state.tasks.insert((deadline, token), Box::new(task));
      state.deadlines.insert(token, deadline);
      token
    };

    self.shared.condvar.notify_one();
    TimerToken(token)
  }

  /// Cancels a scheduled task. A no-op when the task already ran.
  pub fn cancel(&self, token: TimerToken) {
    let Ok(mut state) = unwrap_poison(self.shared.state.lock()) else {
      return;
    };
    if let Some(deadline) = state.deadlines.remove(&token.0) {
      state.tasks.remove(&(deadline, token.0));
    }
  }
}

fn timer_main(shared: Arc<TimerShared>) {
  let Ok(mut state) = unwrap_poison(shared.state.lock()) else {
    return;
  };

  loop {
    if state.shutdown {
      return;
    }

    let now = Instant::now();
    let due = state
      .tasks
      .first_key_value()
      .map(|((deadline, token), _)| (*deadline, *token))
      .filter(|(deadline, _)| *deadline <= now);

    if let Some((deadline, token)) = due {
      let task = state.tasks.remove(&(deadline, token));
      state.deadlines.remove(&token);
      drop(state);
      if let Some(task) = task {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(task)) {
          panic_msg(panic, |msg| log::error!("Timer task panicked: {}", msg));
        }
      }
      state = match unwrap_poison(shared.state.lock()) {
        Ok(state) => state,
        Err(_) => return,
      };
      continue;
    }

    let wait = state
      .tasks
      .first_key_value()
      .map(|((deadline, _), _)| deadline.saturating_duration_since(now));

    state = match wait {
      Some(timeout) => match unwrap_poison(shared.condvar.wait_timeout(state, timeout)) {
        Ok((state, _)) => state,
        Err(_) => return,
      },
      None => match unwrap_poison(shared.condvar.wait(state)) {
        Ok(state) => state,
        Err(_) => return,
      },
    };
  }
}

impl Drop for Timer {
  fn drop(&mut self) {
    if let Ok(mut state) = unwrap_poison(self.shared.state.lock()) {
      state.shutdown = true;
    }
    self.shared.condvar.notify_one();
    if let Some(thread) = self.thread.take() {
      let _ = thread.join();
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use std::sync::atomic::{AtomicBool, Ordering};

  #[test]
  fn fires_after_the_delay() {
    let timer = Timer::new().expect("timer");
    let fired = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&fired);
    timer.schedule(Duration::from_millis(20), move || flag.store(true, Ordering::SeqCst));

    assert!(!fired.load(Ordering::SeqCst));
    thread::sleep(Duration::from_millis(120));
    assert!(fired.load(Ordering::SeqCst));
  }

  #[test]
  fn cancelled_tasks_never_fire() {
    let timer = Timer::new().expect("timer");
    let fired = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&fired);
    let token =
      timer.schedule(Duration::from_millis(20), move || flag.store(true, Ordering::SeqCst));
    timer.cancel(token);

    thread::sleep(Duration::from_millis(120));
    assert!(!fired.load(Ordering::SeqCst));
  }
}
