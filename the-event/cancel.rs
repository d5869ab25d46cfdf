use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{
      AtomicBool,
      Ordering,
    },
  },
};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Shared {
  canceled: AtomicBool,
  notify:   Notify,
}

/// Owner side of a cancelable task.
///
/// Every call to [`TaskController::restart`] cancels the previous handle and
/// hands out a fresh one, so cancelling one run never leaks into the next.
#[derive(Debug, Default)]
pub struct TaskController {
  current: Option<TaskHandle>,
}

impl TaskController {
  pub fn new() -> Self {
    Self::default()
  }

  /// Cancel the current task, if any. Returns whether a live task was
  /// canceled.
  pub fn cancel(&mut self) -> bool {
    match self.current.take() {
      Some(handle) => {
        let was_running = !handle.is_canceled();
        handle.cancel();
        was_running
      },
      None => false,
    }
  }

  /// Whether a handle was handed out and has not been canceled yet.
  pub fn is_running(&self) -> bool {
    self
      .current
      .as_ref()
      .is_some_and(|handle| !handle.is_canceled())
  }

  /// Cancel the current task and return a handle for a new one.
  pub fn restart(&mut self) -> TaskHandle {
    self.cancel();
    let handle = TaskHandle {
      shared: Arc::new(Shared::default()),
    };
    self.current = Some(handle.clone());
    handle
  }
}

impl Drop for TaskController {
  fn drop(&mut self) {
    self.cancel();
  }
}

/// Cancellation token handed to a running task.
///
/// Checking is cooperative: the task observes cancellation through
/// [`TaskHandle::is_canceled`] or by awaiting [`TaskHandle::canceled`].
#[derive(Debug, Clone)]
pub struct TaskHandle {
  shared: Arc<Shared>,
}

impl TaskHandle {
  /// A handle that is never canceled by anyone else.
  pub fn detached() -> Self {
    Self {
      shared: Arc::new(Shared::default()),
    }
  }

  pub fn is_canceled(&self) -> bool {
    self.shared.canceled.load(Ordering::Acquire)
  }

  pub fn cancel(&self) {
    self.shared.canceled.store(true, Ordering::Release);
    self.shared.notify.notify_waiters();
  }

  /// Resolves once the handle is canceled.
  pub async fn canceled(&self) {
    let notified = self.shared.notify.notified();
    tokio::pin!(notified);
    // register before checking the flag so a concurrent cancel is not missed
    notified.as_mut().enable();
    if self.is_canceled() {
      return;
    }
    notified.await;
  }
}

/// Run `future` until it completes or `handle` is canceled.
///
/// Returns `None` when canceled. The future is dropped at that point, which
/// is what stops lazy work that never checks its token.
pub async fn cancelable_future<T>(
  future: impl Future<Output = T>,
  handle: impl std::borrow::Borrow<TaskHandle>,
) -> Option<T> {
  let handle = handle.borrow();
  if handle.is_canceled() {
    return None;
  }
  tokio::select! {
    biased;
    _ = handle.canceled() => None,
    res = future => Some(res),
  }
}
