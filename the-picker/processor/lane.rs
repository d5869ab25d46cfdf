use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use the_event::{
  TaskController,
  TaskHandle,
};
use tokio::task::JoinHandle;

use super::Stage;
use crate::error::{
  ProcessorError,
  Result,
};

/// Runs one invocation of a stage.
pub(super) type Runner<R> = Arc<dyn Fn(R, TaskHandle) -> BoxFuture<'static, ()> + Send + Sync>;

/// Serialized execution of a stage with a one-slot reservation.
///
/// A single worker task runs requests one after the other. A request that
/// arrives while the worker is busy replaces whatever was reserved before it;
/// the worker picks it up once the current invocation has settled. With
/// `restart` the current invocation is also canceled, but the reserved
/// request still waits for it to return, so two invocations of a stage never
/// overlap.
pub(super) struct Lane<R> {
  stage:  Stage,
  state:  Arc<Mutex<LaneState<R>>>,
  runner: Runner<R>,
}

struct LaneState<R> {
  running:    bool,
  disposed:   bool,
  reserved:   Option<R>,
  controller: TaskController,
  task:       Option<JoinHandle<()>>,
}

impl<R: Send + 'static> Lane<R> {
  pub fn new(stage: Stage, runner: Runner<R>) -> Self {
    Self {
      stage,
      state: Arc::new(Mutex::new(LaneState {
        running:    false,
        disposed:   false,
        reserved:   None,
        controller: TaskController::new(),
        task:       None,
      })),
      runner,
    }
  }

  pub fn is_running(&self) -> bool {
    self.state.lock().running
  }

  pub fn is_disposed(&self) -> bool {
    self.state.lock().disposed
  }

  pub fn ensure_alive(&self) -> Result<()> {
    if self.is_disposed() {
      return Err(ProcessorError::Disposed(self.stage));
    }
    Ok(())
  }

  pub fn submit(&self, request: R, restart: bool) -> Result<()> {
    let mut state = self.state.lock();
    if state.disposed {
      return Err(ProcessorError::Disposed(self.stage));
    }
    if state.running {
      if state.reserved.replace(request).is_some() {
        log::debug!("{} request superseded by a newer one", self.stage);
      }
      if restart && state.controller.cancel() {
        log::debug!("{} invocation canceled for restart", self.stage);
      }
      return Ok(());
    }

    state.running = true;
    let handle = state.controller.restart();
    let task = tokio::spawn(drive(
      self.stage,
      Arc::clone(&self.state),
      Arc::clone(&self.runner),
      request,
      handle,
    ));
    state.task = Some(task);
    Ok(())
  }

  /// Cancel the running invocation, drop the reservation and refuse any
  /// further request.
  pub fn dispose(&self) {
    let mut state = self.state.lock();
    if state.disposed {
      return;
    }
    state.disposed = true;
    state.running = false;
    state.reserved = None;
    state.controller.cancel();
    if let Some(task) = state.task.take() {
      task.abort();
    }
    log::debug!("{} processor disposed", self.stage);
  }
}

async fn drive<R>(
  stage: Stage,
  state: Arc<Mutex<LaneState<R>>>,
  runner: Runner<R>,
  mut request: R,
  mut handle: TaskHandle,
) {
  loop {
    runner(request, handle).await;

    let mut guard = state.lock();
    if guard.disposed {
      return;
    }
    match guard.reserved.take() {
      Some(next) => {
        log::debug!("{stage} running reserved request");
        handle = guard.controller.restart();
        request = next;
      },
      None => {
        guard.running = false;
        return;
      },
    }
  }
}
