//! The orchestrator tying the stages together.
//!
//! The picker is driven by [`Picker::tick`], called at a fixed interval on the
//! UI thread. A tick drains the event bus once. Handling an event only
//! touches local state and *reserves* the next stage; reservations are run
//! after the drain, each stage at most once per tick and in the order they
//! were first reserved. The stages report back through the bus, so the
//! effects of this tick are seen on the next one.

use std::{
  collections::HashSet,
  mem::discriminant,
  sync::Arc,
};

use bitflags::bitflags;
use tokio::time::MissedTickBehavior;

use crate::{
  config::PickerConfig,
  error::{
    ExtensionError,
    PickerError,
  },
  event::{
    Event,
    EventBus,
    EventSender,
    SelectMethod,
  },
  extension::{
    CollectParams,
    Matcher,
    Previewer,
    Renderer,
    Sorter,
    Source,
  },
  item::{
    DisplayItem,
    Item,
    ItemId,
    ItemList,
    PreviewItem,
  },
  processor::{
    CollectProcessor,
    MatchProcessor,
    PreviewProcessor,
    RenderProcessor,
    SortProcessor,
    Stage,
  },
};

pub type Result<T> = std::result::Result<T, PickerError>;

bitflags! {
  /// What changed since the previous tick.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
  pub struct Dirty: u8 {
    const QUERY     = 1 << 0;
    const LIST      = 1 << 1;
    const PREVIEW   = 1 << 2;
    const SELECTION = 1 << 3;
    const STATUS    = 1 << 4;
    const COUNTS    = 1 << 5;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageProgress {
  pub running: bool,
  pub failed:  bool,
}

impl StageProgress {
  fn started(&mut self) {
    self.running = true;
    self.failed = false;
  }

  fn succeeded(&mut self) {
    self.running = false;
  }

  fn failed(&mut self) {
    self.running = false;
    self.failed = true;
  }
}

/// Per-stage flags for spinners and failure indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
  pub collect:  StageProgress,
  pub matching: StageProgress,
  pub sort:     StageProgress,
  pub render:   StageProgress,
  pub preview:  StageProgress,
}

impl Progress {
  pub fn collecting(&self) -> bool {
    self.collect.running
  }

  pub fn processing(&self) -> bool {
    self.matching.running || self.sort.running || self.render.running
  }

  pub fn failed(&self) -> bool {
    [self.collect, self.matching, self.sort, self.render, self.preview]
      .iter()
      .any(|stage| stage.failed)
  }

  fn stage_mut(&mut self, stage: Stage) -> &mut StageProgress {
    match stage {
      Stage::Collect => &mut self.collect,
      Stage::Match => &mut self.matching,
      Stage::Sort => &mut self.sort,
      Stage::Render => &mut self.render,
      Stage::Preview => &mut self.preview,
    }
  }
}

/// Everything the UI layer needs to draw the picker.
#[derive(Debug, Clone, PartialEq)]
pub struct PickerView {
  pub query:     String,
  pub collected: usize,
  pub matched:   usize,
  pub truncated: bool,
  pub progress:  Progress,
  /// Decorated visible slice.
  pub items:     Vec<DisplayItem>,
  /// Absolute cursor position in the matched list.
  pub cursor:    usize,
  /// 1-based cursor line within `items`.
  pub line:      usize,
  pub selected:  HashSet<ItemId>,
  pub preview:   Option<PreviewItem>,
}

/// The pluggable pieces a picker runs.
pub struct Extensions {
  pub source:     Arc<dyn Source>,
  pub params:     CollectParams,
  pub matchers:   Vec<Arc<dyn Matcher>>,
  pub sorters:    Vec<Arc<dyn Sorter>>,
  pub renderers:  Vec<Arc<dyn Renderer>>,
  pub previewers: Vec<Arc<dyn Previewer>>,
}

impl Extensions {
  pub fn new(source: Arc<dyn Source>, matcher: Arc<dyn Matcher>) -> Self {
    Self {
      source,
      params: CollectParams::default(),
      matchers: vec![matcher],
      sorters: Vec::new(),
      renderers: Vec::new(),
      previewers: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectControl {
  Pause,
  Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reservation {
  Collect(CollectControl),
  Match { restart: bool },
  Sort,
  Render,
  Preview,
}

/// Stage invocations requested during one drain, at most one per stage.
#[derive(Debug, Default)]
struct Reservations(Vec<Reservation>);

impl Reservations {
  fn reserve(&mut self, reservation: Reservation) {
    let slot = self
      .0
      .iter()
      .position(|reserved| discriminant(reserved) == discriminant(&reservation));
    let Some(slot) = slot else {
      self.0.push(reservation);
      return;
    };
    match (&mut self.0[slot], reservation) {
      (
        Reservation::Match { restart },
        Reservation::Match {
          restart: restart_again,
        },
      ) => *restart |= restart_again,
      (reserved, reservation) => *reserved = reservation,
    }
  }
}

/// Which list the renderer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderInput {
  Sorted,
  /// Sorting failed; show the matched order.
  Matched,
}

pub struct Picker {
  config:       PickerConfig,
  bus:          Arc<EventBus>,
  source:       Arc<dyn Source>,
  params:       CollectParams,
  collect:      CollectProcessor,
  matcher:      MatchProcessor,
  sorter:       SortProcessor,
  renderer:     RenderProcessor,
  previewer:    PreviewProcessor,
  query:        String,
  selection:    HashSet<ItemId>,
  progress:     Progress,
  render_input: RenderInput,
  /// Item the last preview was requested for.
  previewed:    Option<Option<ItemId>>,
  dirty:        Dirty,
  disposed:     bool,
}

impl Picker {
  pub fn new(extensions: Extensions, config: PickerConfig) -> Result<Self> {
    let bus = Arc::new(EventBus::new());
    let collect = CollectProcessor::new(config.collect.clone(), bus.sender())?;
    let matcher = MatchProcessor::new(
      extensions.matchers,
      config.matching.clone(),
      bus.sender(),
    )?;
    let sorter = SortProcessor::new(extensions.sorters, bus.sender());
    let renderer = RenderProcessor::new(extensions.renderers, config.render.clone(), bus.sender());
    let previewer = PreviewProcessor::new(extensions.previewers, bus.sender());

    Ok(Self {
      config,
      bus,
      source: extensions.source,
      params: extensions.params,
      collect,
      matcher,
      sorter,
      renderer,
      previewer,
      query: String::new(),
      selection: HashSet::new(),
      progress: Progress::default(),
      render_input: RenderInput::Sorted,
      previewed: None,
      dirty: Dirty::all(),
      disposed: false,
    })
  }

  /// Preset the query before [`Picker::open`].
  pub fn with_query(mut self, query: impl Into<String>) -> Self {
    self.query = query.into();
    self
  }

  pub fn config(&self) -> &PickerConfig {
    &self.config
  }

  /// Handle for the editor side to push input events.
  pub fn sender(&self) -> EventSender {
    self.bus.sender()
  }

  /// Start collecting. Everything downstream follows from the events.
  pub fn open(&mut self) -> Result<()> {
    self.ensure_alive()?;
    self
      .collect
      .start(Arc::clone(&self.source), self.params.clone())?;
    Ok(())
  }

  /// Run one scheduler tick and report what changed.
  pub fn tick(&mut self) -> Result<Dirty> {
    self.ensure_alive()?;
    let mut reservations = Reservations::default();
    let bus = Arc::clone(&self.bus);
    bus.consume(|event| self.handle_event(event, &mut reservations));
    for reservation in reservations.0 {
      self.invoke(reservation)?;
    }
    Ok(std::mem::take(&mut self.dirty))
  }

  /// Tick at the configured interval until every stage settled.
  pub async fn run_until_idle(&mut self) -> Result<()> {
    let mut ticker = tokio::time::interval(self.config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      self.tick()?;
      if self.is_idle() {
        return Ok(());
      }
    }
  }

  /// No stage is running and no event is waiting.
  pub fn is_idle(&self) -> bool {
    self.bus.is_empty()
      && !self.collect.is_running()
      && !self.matcher.is_running()
      && !self.sorter.is_running()
      && !self.renderer.is_running()
      && !self.previewer.is_running()
  }

  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn progress(&self) -> Progress {
    self.progress
  }

  pub fn collected_items(&self) -> ItemList {
    self.collect.items()
  }

  /// Matched items in the order the list shows them.
  pub fn matched_items(&self) -> ItemList {
    self.renderer.source()
  }

  pub fn current_item(&self) -> Option<Arc<Item>> {
    self.renderer.current_item()
  }

  pub fn selection(&self) -> &HashSet<ItemId> {
    &self.selection
  }

  /// Selected items in list order, or the current item when nothing is
  /// selected.
  pub fn selected_items(&self) -> Vec<Arc<Item>> {
    if self.selection.is_empty() {
      return self.current_item().into_iter().collect();
    }
    self
      .matched_items()
      .iter()
      .filter(|item| self.selection.contains(&item.id))
      .cloned()
      .collect()
  }

  pub fn view(&self) -> PickerView {
    PickerView {
      query:     self.query.clone(),
      collected: self.collect.items().len(),
      matched:   self.matcher.items().len(),
      truncated: self.collect.truncated(),
      progress:  self.progress,
      items:     self.renderer.items(),
      cursor:    self.renderer.cursor(),
      line:      self.renderer.line(),
      selected:  self.selection.clone(),
      preview:   self.previewer.item(),
    }
  }

  /// Cancel every stage, last stage first. No event is delivered afterwards.
  pub fn dispose(&mut self) {
    if self.disposed {
      return;
    }
    self.disposed = true;
    self.previewer.dispose();
    self.renderer.dispose();
    self.sorter.dispose();
    self.matcher.dispose();
    self.collect.dispose();
    self.bus.clear();
    log::debug!("picker disposed");
  }

  fn ensure_alive(&self) -> Result<()> {
    if self.disposed {
      return Err(PickerError::Disposed);
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event, reservations: &mut Reservations) {
    log::trace!("picker event: {}", event.name());
    match event {
      Event::CmdlineChanged { query } => {
        if query != self.query {
          self.query = query;
          self.dirty |= Dirty::QUERY;
          reservations.reserve(Reservation::Match { restart: true });
        }
      },
      Event::MoveCursor { amount, cycle } => {
        let cursor = the_stdx::step_index(
          self.renderer.cursor(),
          amount,
          self.renderer.item_count(),
          cycle || self.config.cycle,
        );
        self.move_cursor(cursor, reservations);
      },
      Event::MoveCursorAt { cursor } => self.move_cursor(cursor, reservations),
      Event::SelectItem { cursor, method } => {
        let cursor = cursor.unwrap_or_else(|| self.renderer.cursor());
        if let Some(item) = self.renderer.source().get(cursor) {
          apply_selection(&mut self.selection, item.id, method);
          self.dirty |= Dirty::SELECTION;
        }
      },
      Event::SelectAllItems { method } => {
        for item in self.renderer.source().iter() {
          apply_selection(&mut self.selection, item.id, method);
        }
        self.dirty |= Dirty::SELECTION;
      },
      Event::SwitchMatcher { amount, cycle } => {
        self.switch(self.matcher.select_matcher(amount, cycle));
        reservations.reserve(Reservation::Match { restart: true });
      },
      Event::SwitchMatcherAt { index } => {
        self.switch(self.matcher.set_matcher_index(index));
        reservations.reserve(Reservation::Match { restart: true });
      },
      Event::SwitchSorter { amount, cycle } => {
        self.switch(self.sorter.select_sorter(amount, cycle));
        reservations.reserve(Reservation::Sort);
      },
      Event::SwitchSorterAt { index } => {
        self.switch(self.sorter.set_sorter_index(index));
        reservations.reserve(Reservation::Sort);
      },
      Event::SwitchRenderer { amount, cycle } => {
        self.switch(self.renderer.select_renderer(amount, cycle));
        reservations.reserve(Reservation::Render);
      },
      Event::SwitchRendererAt { index } => {
        self.switch(self.renderer.set_renderer_index(index));
        reservations.reserve(Reservation::Render);
      },
      Event::SwitchPreviewer { amount, cycle } => {
        self.switch(self.previewer.select_previewer(amount, cycle));
        self.previewed = None;
        reservations.reserve(Reservation::Preview);
      },
      Event::SwitchPreviewerAt { index } => {
        self.switch(self.previewer.set_previewer_index(index));
        self.previewed = None;
        reservations.reserve(Reservation::Preview);
      },
      Event::CollectPause => reservations.reserve(Reservation::Collect(CollectControl::Pause)),
      Event::CollectResume => reservations.reserve(Reservation::Collect(CollectControl::Resume)),

      Event::CollectStarted => self.stage_started(Stage::Collect),
      Event::CollectUpdated => {
        self.dirty |= Dirty::COUNTS;
        reservations.reserve(Reservation::Match { restart: false });
      },
      Event::CollectSucceeded => {
        self.stage_succeeded(Stage::Collect);
        self.dirty |= Dirty::COUNTS;
        reservations.reserve(Reservation::Match { restart: false });
      },
      Event::CollectFailed { err } => self.stage_failed(Stage::Collect, &err),

      Event::MatchStarted => self.stage_started(Stage::Match),
      Event::MatchUpdated => {
        self.dirty |= Dirty::COUNTS;
        reservations.reserve(Reservation::Sort);
      },
      Event::MatchSucceeded => {
        self.stage_succeeded(Stage::Match);
        self.dirty |= Dirty::COUNTS;
        reservations.reserve(Reservation::Sort);
      },
      Event::MatchFailed { err } => self.stage_failed(Stage::Match, &err),

      Event::SortStarted => self.stage_started(Stage::Sort),
      Event::SortSucceeded => {
        self.stage_succeeded(Stage::Sort);
        self.render_input = RenderInput::Sorted;
        reservations.reserve(Reservation::Render);
      },
      Event::SortFailed { err } => {
        self.stage_failed(Stage::Sort, &err);
        self.render_input = RenderInput::Matched;
        reservations.reserve(Reservation::Render);
      },

      Event::RenderStarted => self.stage_started(Stage::Render),
      Event::RenderSucceeded => {
        self.stage_succeeded(Stage::Render);
        self.dirty |= Dirty::LIST;
        reservations.reserve(Reservation::Preview);
      },
      Event::RenderFailed { err } => {
        self.stage_failed(Stage::Render, &err);
        self.dirty |= Dirty::LIST;
        reservations.reserve(Reservation::Preview);
      },

      Event::PreviewStarted => self.stage_started(Stage::Preview),
      Event::PreviewSucceeded => {
        self.stage_succeeded(Stage::Preview);
        self.dirty |= Dirty::PREVIEW;
      },
      Event::PreviewFailed { err } => {
        self.stage_failed(Stage::Preview, &err);
        self.dirty |= Dirty::PREVIEW;
      },
    }
  }

  fn move_cursor(&mut self, cursor: usize, reservations: &mut Reservations) {
    self.renderer.set_cursor(cursor);
    self.dirty |= Dirty::LIST;
    reservations.reserve(Reservation::Render);
    reservations.reserve(Reservation::Preview);
  }

  fn switch(&mut self, result: crate::error::Result<()>) {
    // only fails once disposed, and a disposed picker does not tick
    if let Err(err) = result {
      log::warn!("ignored extension switch: {err}");
    }
    self.dirty |= Dirty::STATUS;
  }

  fn stage_started(&mut self, stage: Stage) {
    self.progress.stage_mut(stage).started();
    self.dirty |= Dirty::STATUS;
  }

  fn stage_succeeded(&mut self, stage: Stage) {
    self.progress.stage_mut(stage).succeeded();
    self.dirty |= Dirty::STATUS;
  }

  fn stage_failed(&mut self, stage: Stage, err: &ExtensionError) {
    log::error!("{stage} stage failed: {err:#}");
    self.progress.stage_mut(stage).failed();
    self.dirty |= Dirty::STATUS;
  }

  fn invoke(&mut self, reservation: Reservation) -> Result<()> {
    match reservation {
      Reservation::Collect(CollectControl::Pause) => self.collect.pause()?,
      Reservation::Collect(CollectControl::Resume) => {
        // resuming must never start a second collection
        if self.collect.is_running() {
          self
            .collect
            .start(Arc::clone(&self.source), self.params.clone())?;
        }
      },
      Reservation::Match { restart } => {
        self
          .matcher
          .start(self.collect.items(), &self.query, restart)?
      },
      Reservation::Sort => self.sorter.start(self.matcher.items())?,
      Reservation::Render => {
        let items = match self.render_input {
          RenderInput::Sorted => self.sorter.items(),
          RenderInput::Matched => self.matcher.items(),
        };
        self.renderer.start(items)?;
      },
      Reservation::Preview => {
        let item = self.renderer.current_item();
        let id = item.as_ref().map(|item| item.id);
        if self.previewed != Some(id) {
          self.previewed = Some(id);
          self.previewer.start(item)?;
        }
      },
    }
    Ok(())
  }
}

impl Drop for Picker {
  fn drop(&mut self) {
    self.dispose();
  }
}

fn apply_selection(selection: &mut HashSet<ItemId>, id: ItemId, method: SelectMethod) {
  match method {
    SelectMethod::On => {
      selection.insert(id);
    },
    SelectMethod::Off => {
      selection.remove(&id);
    },
    SelectMethod::Toggle => {
      if !selection.remove(&id) {
        selection.insert(id);
      }
    },
  }
}
