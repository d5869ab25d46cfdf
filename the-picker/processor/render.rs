use std::sync::Arc;

use anyhow::anyhow;
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
  config::RenderConfig,
  error::Result,
  event::{
    Event,
    EventSender,
  },
  extension::Renderer,
  item::{
    DisplayItem,
    Item,
    ItemList,
  },
  scroll::adjust_offset,
};

struct RenderState {
  renderers:     ItemBelt<Arc<dyn Renderer>>,
  /// The full list the viewport was last computed for.
  source:        ItemList,
  /// Decorated visible slice.
  items:         Vec<DisplayItem>,
  cursor:        usize,
  offset:        usize,
  height:        usize,
  width:         usize,
  scroll_offset: usize,
}

impl RenderState {
  fn item_count(&self) -> usize {
    self.source.len()
  }

  fn set_cursor(&mut self, cursor: usize) {
    self.cursor = cursor.min(self.item_count().saturating_sub(1));
    self.offset = adjust_offset(
      self.offset as isize,
      self.cursor,
      self.item_count(),
      self.height,
      self.scroll_offset,
    );
  }
}

/// Owns the visible window of the list.
///
/// Each run slices `[offset, offset + height)` out of the given items and
/// has the current renderer decorate it. When the renderer fails, or returns
/// a different number of items, the undecorated slice is shown instead and
/// `RenderFailed` is reported.
pub struct RenderProcessor {
  state: Arc<Mutex<RenderState>>,
  lane:  Lane<ItemList>,
}

impl RenderProcessor {
  pub fn new(renderers: Vec<Arc<dyn Renderer>>, config: RenderConfig, sender: EventSender) -> Self {
    let state = Arc::new(Mutex::new(RenderState {
      renderers:     ItemBelt::new(renderers),
      source:        Arc::new(Vec::new()),
      items:         Vec::new(),
      cursor:        0,
      offset:        0,
      height:        config.height,
      width:         config.width,
      scroll_offset: config.scroll_offset,
    }));
    let runner: Runner<ItemList> = {
      let state = Arc::clone(&state);
      Arc::new(move |items, handle| run(Arc::clone(&state), sender.clone(), items, handle).boxed())
    };
    Self {
      state,
      lane: Lane::new(Stage::Render, runner),
    }
  }

  /// The decorated visible slice.
  pub fn items(&self) -> Vec<DisplayItem> {
    self.state.lock().items.clone()
  }

  /// The full list the viewport refers to.
  pub fn source(&self) -> ItemList {
    Arc::clone(&self.state.lock().source)
  }

  pub fn item_count(&self) -> usize {
    self.state.lock().item_count()
  }

  /// The item under the cursor.
  pub fn current_item(&self) -> Option<Arc<Item>> {
    let state = self.state.lock();
    state.source.get(state.cursor).cloned()
  }

  pub fn cursor(&self) -> usize {
    self.state.lock().cursor
  }

  /// Move the cursor, clamped to the item count, and update the offset
  /// right away so viewport math stays consistent until the next render.
  pub fn set_cursor(&self, cursor: usize) {
    self.state.lock().set_cursor(cursor);
  }

  pub fn offset(&self) -> usize {
    self.state.lock().offset
  }

  /// 1-based cursor line within the visible slice.
  pub fn line(&self) -> usize {
    let state = self.state.lock();
    state.cursor.saturating_sub(state.offset) + 1
  }

  pub fn height(&self) -> usize {
    self.state.lock().height
  }

  pub fn set_height(&self, height: usize) {
    let mut state = self.state.lock();
    state.height = height;
    let cursor = state.cursor;
    state.set_cursor(cursor);
  }

  pub fn set_width(&self, width: usize) {
    self.state.lock().width = width;
  }

  pub fn is_running(&self) -> bool {
    self.lane.is_running()
  }

  pub fn start(&self, items: ItemList) -> Result<()> {
    self.lane.submit(items, false)
  }

  pub fn renderer_index(&self) -> usize {
    self.state.lock().renderers.index()
  }

  pub fn renderer_count(&self) -> usize {
    self.state.lock().renderers.count()
  }

  pub fn select_renderer(&self, amount: isize, cycle: bool) -> Result<()> {
    self.lane.ensure_alive()?;
    self.state.lock().renderers.select(amount, cycle);
    Ok(())
  }

  pub fn set_renderer_index(&self, index: usize) -> Result<()> {
    self.lane.ensure_alive()?;
    self
      .state
      .lock()
      .renderers
      .set_index(index.min(isize::MAX as usize) as isize);
    Ok(())
  }

  pub fn dispose(&self) {
    self.lane.dispose();
  }
}

impl Drop for RenderProcessor {
  fn drop(&mut self) {
    self.dispose();
  }
}

async fn run(
  state: Arc<Mutex<RenderState>>,
  sender: EventSender,
  items: ItemList,
  handle: TaskHandle,
) {
  let emitter = Emitter::new(sender, handle.clone());
  let (renderer, window, width) = {
    let mut state = state.lock();
    state.source = items;
    let cursor = state.cursor;
    state.set_cursor(cursor);
    let end = (state.offset + state.height).min(state.item_count());
    let window: Vec<DisplayItem> = state.source[state.offset..end]
      .iter()
      .map(|item| DisplayItem::from(item.as_ref()))
      .collect();
    (state.renderers.current().cloned(), window, state.width)
  };

  emitter.emit(Event::RenderStarted);
  let Some(renderer) = renderer else {
    state.lock().items = window;
    emitter.emit(Event::RenderSucceeded);
    return;
  };

  let expected = window.len();
  let rendered = match cancelable_future(renderer.render(window.clone(), width, &handle), &handle)
    .await
  {
    None => {
      log::debug!("render canceled");
      return;
    },
    Some(Ok(rendered)) if rendered.len() == expected => Ok(rendered),
    Some(Ok(rendered)) => Err(anyhow!(
      "renderer returned {} items for a slice of {expected}",
      rendered.len()
    )),
    Some(Err(err)) => Err(err),
  };
  if handle.is_canceled() {
    return;
  }
  match rendered {
    Ok(rendered) => {
      state.lock().items = rendered;
      emitter.emit(Event::RenderSucceeded);
    },
    Err(err) => {
      log::error!("renderer failed: {err:#}");
      state.lock().items = window;
      emitter.emit(Event::RenderFailed { err: Arc::new(err) });
    },
  }
}
