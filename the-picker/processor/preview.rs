use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::Mutex;
use the_event::{
  TaskHandle,
  cancelable_future,
};
use the_stdx::ItemBelt;

use super::{
  Emitter,
  Stage,
  lane::{
    Lane,
    Runner,
  },
};
use crate::{
  error::Result,
  event::{
    Event,
    EventSender,
  },
  extension::Previewer,
  item::{
    Item,
    PreviewItem,
  },
};

struct PreviewState {
  previewers: ItemBelt<Arc<dyn Previewer>>,
  item:       Option<PreviewItem>,
}

/// Produces the preview of the item under the cursor.
pub struct PreviewProcessor {
  state: Arc<Mutex<PreviewState>>,
  lane:  Lane<Option<Arc<Item>>>,
}

impl PreviewProcessor {
  pub fn new(previewers: Vec<Arc<dyn Previewer>>, sender: EventSender) -> Self {
    let state = Arc::new(Mutex::new(PreviewState {
      previewers: ItemBelt::new(previewers),
      item:       None,
    }));
    let runner: Runner<Option<Arc<Item>>> = {
      let state = Arc::clone(&state);
      Arc::new(move |item, handle| run(Arc::clone(&state), sender.clone(), item, handle).boxed())
    };
    Self {
      state,
      lane: Lane::new(Stage::Preview, runner),
    }
  }

  pub fn item(&self) -> Option<PreviewItem> {
    self.state.lock().item.clone()
  }

  pub fn is_running(&self) -> bool {
    self.lane.is_running()
  }

  /// Preview `item`, or clear the preview when `None`.
  pub fn start(&self, item: Option<Arc<Item>>) -> Result<()> {
    self.lane.submit(item, false)
  }

  pub fn previewer_index(&self) -> usize {
    self.state.lock().previewers.index()
  }

  pub fn previewer_count(&self) -> usize {
    self.state.lock().previewers.count()
  }

  pub fn select_previewer(&self, amount: isize, cycle: bool) -> Result<()> {
    self.lane.ensure_alive()?;
    self.state.lock().previewers.select(amount, cycle);
    Ok(())
  }

  pub fn set_previewer_index(&self, index: usize) -> Result<()> {
    self.lane.ensure_alive()?;
    self
      .state
      .lock()
      .previewers
      .set_index(index.min(isize::MAX as usize) as isize);
    Ok(())
  }

  pub fn dispose(&self) {
    self.lane.dispose();
  }
}

impl Drop for PreviewProcessor {
  fn drop(&mut self) {
    self.dispose();
  }
}

async fn run(
  state: Arc<Mutex<PreviewState>>,
  sender: EventSender,
  item: Option<Arc<Item>>,
  handle: TaskHandle,
) {
  let emitter = Emitter::new(sender, handle.clone());
  let previewer = state.lock().previewers.current().cloned();

  emitter.emit(Event::PreviewStarted);
  let preview = match (item, previewer) {
    (Some(item), Some(previewer)) => {
      match cancelable_future(previewer.preview(&item, &handle), &handle).await {
        None => {
          log::debug!("preview canceled");
          return;
        },
        Some(Err(err)) => {
          log::error!("previewer failed for item {}: {err:#}", item.id);
          state.lock().item = None;
          emitter.emit(Event::PreviewFailed { err: Arc::new(err) });
          return;
        },
        Some(Ok(preview)) => preview,
      }
    },
    _ => None,
  };
  if handle.is_canceled() {
    return;
  }
  state.lock().item = preview;
  emitter.emit(Event::PreviewSucceeded);
}
