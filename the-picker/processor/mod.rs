//! The five pipeline stages.
//!
//! Each processor owns its output, a [`TaskController`](the_event::TaskController)
//! and at most one running invocation. Progress is reported on the picker's
//! event bus; the processors never call each other.

mod collect;
mod lane;
mod matcher;
mod preview;
mod render;
mod sort;

use std::{
  fmt,
  time::Duration,
};

pub use collect::CollectProcessor;
pub use matcher::MatchProcessor;
pub use preview::PreviewProcessor;
pub use render::RenderProcessor;
pub use sort::SortProcessor;
use the_event::{
  TaskHandle,
  cancelable_future,
};

use crate::event::{
  Event,
  EventSender,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
  Collect,
  Match,
  Sort,
  Render,
  Preview,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Collect => "collect",
      Self::Match => "match",
      Self::Sort => "sort",
      Self::Render => "render",
      Self::Preview => "preview",
    })
  }
}

/// Event sender bound to one invocation.
///
/// Once the invocation's handle is canceled nothing more is dispatched, which
/// is what keeps a disposed or superseded stage silent.
#[derive(Clone)]
struct Emitter {
  sender: EventSender,
  handle: TaskHandle,
}

impl Emitter {
  fn new(sender: EventSender, handle: TaskHandle) -> Self {
    Self { sender, handle }
  }

  fn emit(&self, event: Event) {
    let name = event.name();
    // checked under the bus lock so a dispose followed by a clear wins
    if !self.sender.dispatch_if(event, || !self.handle.is_canceled()) {
      log::debug!("suppressed {name} from a canceled invocation");
    }
  }
}

/// Give the scheduler a chance to run between two chunks.
///
/// Returns `false` when canceled while waiting.
async fn chunk_pause(interval: Duration, handle: &TaskHandle) -> bool {
  if interval.is_zero() {
    tokio::task::yield_now().await;
    return !handle.is_canceled();
  }
  cancelable_future(tokio::time::sleep(interval), handle)
    .await
    .is_some()
}
