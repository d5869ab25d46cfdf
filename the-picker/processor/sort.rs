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
  extension::Sorter,
  item::ItemList,
};

struct SortState {
  sorters: ItemBelt<Arc<dyn Sorter>>,
  items:   ItemList,
}

/// Reorders the matched items with the current sorter.
///
/// With no sorter configured the items pass through unchanged. Requests
/// arriving while busy are reserved, the latest one wins.
pub struct SortProcessor {
  state: Arc<Mutex<SortState>>,
  lane:  Lane<ItemList>,
}

impl SortProcessor {
  pub fn new(sorters: Vec<Arc<dyn Sorter>>, sender: EventSender) -> Self {
    let state = Arc::new(Mutex::new(SortState {
      sorters: ItemBelt::new(sorters),
      items:   Arc::new(Vec::new()),
    }));
    let runner: Runner<ItemList> = {
      let state = Arc::clone(&state);
      Arc::new(move |items, handle| run(Arc::clone(&state), sender.clone(), items, handle).boxed())
    };
    Self {
      state,
      lane: Lane::new(Stage::Sort, runner),
    }
  }

  pub fn items(&self) -> ItemList {
    Arc::clone(&self.state.lock().items)
  }

  pub fn is_running(&self) -> bool {
    self.lane.is_running()
  }

  pub fn start(&self, items: ItemList) -> Result<()> {
    self.lane.submit(items, false)
  }

  pub fn sorter_index(&self) -> usize {
    self.state.lock().sorters.index()
  }

  pub fn sorter_count(&self) -> usize {
    self.state.lock().sorters.count()
  }

  pub fn select_sorter(&self, amount: isize, cycle: bool) -> Result<()> {
    self.lane.ensure_alive()?;
    self.state.lock().sorters.select(amount, cycle);
    Ok(())
  }

  pub fn set_sorter_index(&self, index: usize) -> Result<()> {
    self.lane.ensure_alive()?;
    self
      .state
      .lock()
      .sorters
      .set_index(index.min(isize::MAX as usize) as isize);
    Ok(())
  }

  pub fn dispose(&self) {
    self.lane.dispose();
  }
}

impl Drop for SortProcessor {
  fn drop(&mut self) {
    self.dispose();
  }
}

async fn run(
  state: Arc<Mutex<SortState>>,
  sender: EventSender,
  items: ItemList,
  handle: TaskHandle,
) {
  let emitter = Emitter::new(sender, handle.clone());
  let sorter = state.lock().sorters.current().cloned();

  emitter.emit(Event::SortStarted);
  // clones pointers, the items themselves are shared
  let mut items = Vec::clone(&items);
  if let Some(sorter) = sorter {
    match cancelable_future(sorter.sort(&mut items, &handle), &handle).await {
      None => {
        log::debug!("sort canceled");
        return;
      },
      Some(Err(err)) => {
        log::error!("sorter failed: {err:#}");
        emitter.emit(Event::SortFailed { err: Arc::new(err) });
        return;
      },
      Some(Ok(())) => {},
    }
  }
  if handle.is_canceled() {
    return;
  }
  state.lock().items = Arc::new(items);
  emitter.emit(Event::SortSucceeded);
}
