use std::sync::Arc;

use futures_util::{
  FutureExt,
  StreamExt,
};
use parking_lot::Mutex;
use the_event::{
  TaskHandle,
  cancelable_future,
};
use the_stdx::{
  Chunker,
  ItemBelt,
};

use super::{
  Emitter,
  Stage,
  chunk_pause,
  lane::{
    Lane,
    Runner,
  },
};
use crate::{
  config::MatchConfig,
  error::{
    ProcessorError,
    Result,
  },
  event::{
    Event,
    EventSender,
  },
  extension::Matcher,
  item::{
    Item,
    ItemList,
  },
};

struct MatchRequest {
  items: ItemList,
  query: String,
}

struct MatchState {
  matchers: ItemBelt<Arc<dyn Matcher>>,
  items:    ItemList,
}

/// Filters the collected items by the query.
///
/// In incremental mode every flushed chunk is published right away with a
/// `MatchUpdated`; otherwise the result is only published on
/// `MatchSucceeded`. A failed run leaves the previous result in place.
pub struct MatchProcessor {
  state: Arc<Mutex<MatchState>>,
  lane:  Lane<MatchRequest>,
}

impl MatchProcessor {
  pub fn new(
    matchers: Vec<Arc<dyn Matcher>>,
    config: MatchConfig,
    sender: EventSender,
  ) -> Result<Self> {
    if matchers.is_empty() {
      return Err(ProcessorError::NoExtension(Stage::Match));
    }
    if config.chunk_size == 0 || config.threshold == 0 {
      return Err(ProcessorError::InvalidArgument {
        stage:   Stage::Match,
        message: "chunk-size and threshold must be positive".into(),
      });
    }

    let state = Arc::new(Mutex::new(MatchState {
      matchers: ItemBelt::new(matchers),
      items:    Arc::new(Vec::new()),
    }));
    let runner: Runner<MatchRequest> = {
      let state = Arc::clone(&state);
      let config = Arc::new(config);
      Arc::new(move |request, handle| {
        run(
          Arc::clone(&state),
          Arc::clone(&config),
          sender.clone(),
          request,
          handle,
        )
        .boxed()
      })
    };

    Ok(Self {
      state,
      lane: Lane::new(Stage::Match, runner),
    })
  }

  /// The latest exposed result.
  pub fn items(&self) -> ItemList {
    Arc::clone(&self.state.lock().items)
  }

  pub fn is_running(&self) -> bool {
    self.lane.is_running()
  }

  /// Match `items` against `query`.
  ///
  /// While a run is in flight the request is reserved (replacing any older
  /// reservation) and runs after it; `restart` also cancels the run in
  /// flight.
  pub fn start(&self, items: ItemList, query: &str, restart: bool) -> Result<()> {
    let request = MatchRequest {
      items,
      query: query.to_owned(),
    };
    self.lane.submit(request, restart)
  }

  pub fn matcher_index(&self) -> usize {
    self.state.lock().matchers.index()
  }

  pub fn matcher_count(&self) -> usize {
    self.state.lock().matchers.count()
  }

  pub fn select_matcher(&self, amount: isize, cycle: bool) -> Result<()> {
    self.lane.ensure_alive()?;
    self.state.lock().matchers.select(amount, cycle);
    Ok(())
  }

  pub fn set_matcher_index(&self, index: usize) -> Result<()> {
    self.lane.ensure_alive()?;
    self
      .state
      .lock()
      .matchers
      .set_index(index.min(isize::MAX as usize) as isize);
    Ok(())
  }

  pub fn dispose(&self) {
    self.lane.dispose();
  }
}

impl Drop for MatchProcessor {
  fn drop(&mut self) {
    self.dispose();
  }
}

async fn run(
  state: Arc<Mutex<MatchState>>,
  config: Arc<MatchConfig>,
  sender: EventSender,
  request: MatchRequest,
  handle: TaskHandle,
) {
  let emitter = Emitter::new(sender, handle.clone());
  let Some(matcher) = state.lock().matchers.current().cloned() else {
    return;
  };
  let incremental = config.incremental || matcher.incremental();

  emitter.emit(Event::MatchStarted);
  match match_items(&state, &config, &emitter, matcher, request, incremental, &handle).await {
    Ok(true) => emitter.emit(Event::MatchSucceeded),
    Ok(false) => log::debug!("match canceled"),
    Err(err) => {
      log::error!("matcher failed: {err:#}");
      emitter.emit(Event::MatchFailed { err: Arc::new(err) });
    },
  }
}

/// Returns `false` when canceled.
async fn match_items(
  state: &Mutex<MatchState>,
  config: &MatchConfig,
  emitter: &Emitter,
  matcher: Arc<dyn Matcher>,
  request: MatchRequest,
  incremental: bool,
  handle: &TaskHandle,
) -> anyhow::Result<bool> {
  let mut stream = matcher.match_items(request.items, &request.query, handle.clone());
  let mut chunker = Chunker::new(config.chunk_size)?;
  let mut output = Output::new(incremental);

  while output.count + chunker.count() < config.threshold {
    let Some(next) = cancelable_future(stream.next(), handle).await else {
      return Ok(false);
    };
    let Some(item) = next else {
      break;
    };
    if !chunker.put(item?)? {
      continue;
    }

    if handle.is_canceled() {
      return Ok(false);
    }
    if output.push(state, chunker.consume()) {
      emitter.emit(Event::MatchUpdated);
    }
    if !chunk_pause(config.chunk_interval(), handle).await {
      return Ok(false);
    }
  }

  if handle.is_canceled() {
    return Ok(false);
  }
  output.push(state, chunker.consume());
  output.finish(state);
  Ok(true)
}

/// Where flushed chunks go during one run.
///
/// Incremental runs append straight to the exposed list, which copies
/// pointers only while a downstream stage still holds the previous snapshot.
/// Batch runs keep the chunks private until [`Output::finish`].
struct Output {
  incremental: bool,
  published:   bool,
  pending:     Vec<Arc<Item>>,
  count:       usize,
}

impl Output {
  fn new(incremental: bool) -> Self {
    Self {
      incremental,
      published: false,
      pending: Vec::new(),
      count: 0,
    }
  }

  /// Returns `true` when the chunk was exposed.
  fn push(&mut self, state: &Mutex<MatchState>, chunk: Vec<Arc<Item>>) -> bool {
    self.count += chunk.len();
    if !self.incremental {
      self.pending.extend(chunk);
      return false;
    }

    if self.published && chunk.is_empty() {
      return false;
    }
    let mut state = state.lock();
    if self.published {
      Arc::make_mut(&mut state.items).extend(chunk);
    } else {
      // the first chunk replaces the previous run's result
      state.items = Arc::new(chunk);
      self.published = true;
    }
    true
  }

  fn finish(self, state: &Mutex<MatchState>) {
    if !self.incremental {
      state.lock().items = Arc::new(self.pending);
    }
  }
}
