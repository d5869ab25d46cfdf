use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use the_event::{
  TaskController,
  TaskHandle,
  cancelable_future,
};
use the_stdx::Chunker;
use tokio::{
  sync::Notify,
  task::JoinHandle,
};

use super::{
  Emitter,
  Stage,
  chunk_pause,
};
use crate::{
  config::CollectConfig,
  error::{
    ProcessorError,
    Result,
  },
  event::{
    Event,
    EventSender,
  },
  extension::{
    CollectParams,
    Source,
  },
  item::{
    Item,
    ItemList,
  },
};

struct CollectState {
  items:      ItemList,
  truncated:  bool,
  running:    bool,
  paused:     bool,
  disposed:   bool,
  controller: TaskController,
  task:       Option<JoinHandle<()>>,
}

/// Pulls items out of a [`Source`] and numbers them.
///
/// Collection can be paused and resumed without losing what was collected.
/// It stops without error once `threshold` items arrived and remembers that
/// the result was truncated.
pub struct CollectProcessor {
  state:  Arc<Mutex<CollectState>>,
  resume: Arc<Notify>,
  config: CollectConfig,
  sender: EventSender,
}

impl CollectProcessor {
  pub fn new(config: CollectConfig, sender: EventSender) -> Result<Self> {
    if config.chunk_size == 0 || config.threshold == 0 {
      return Err(ProcessorError::InvalidArgument {
        stage:   Stage::Collect,
        message: "chunk-size and threshold must be positive".into(),
      });
    }
    Ok(Self {
      state: Arc::new(Mutex::new(CollectState {
        items:      Arc::new(Vec::new()),
        truncated:  false,
        running:    false,
        paused:     false,
        disposed:   false,
        controller: TaskController::new(),
        task:       None,
      })),
      resume: Arc::new(Notify::new()),
      config,
      sender,
    })
  }

  pub fn items(&self) -> ItemList {
    Arc::clone(&self.state.lock().items)
  }

  pub fn truncated(&self) -> bool {
    self.state.lock().truncated
  }

  pub fn is_running(&self) -> bool {
    self.state.lock().running
  }

  pub fn is_paused(&self) -> bool {
    self.state.lock().paused
  }

  /// Start collecting from `source`, or resume a paused collection.
  ///
  /// A collection in progress is never restarted; the arguments are ignored
  /// in that case.
  pub fn start(&self, source: Arc<dyn Source>, params: CollectParams) -> Result<()> {
    let mut state = self.state.lock();
    if state.disposed {
      return Err(ProcessorError::Disposed(Stage::Collect));
    }
    if state.running {
      if state.paused {
        state.paused = false;
        self.resume.notify_waiters();
        log::debug!("collect resumed");
      }
      return Ok(());
    }

    state.running = true;
    state.paused = false;
    state.truncated = false;
    state.items = Arc::new(Vec::new());
    let handle = state.controller.restart();
    let task = tokio::spawn(run(
      Arc::clone(&self.state),
      Arc::clone(&self.resume),
      self.config.clone(),
      self.sender.clone(),
      source,
      params,
      handle,
    ));
    state.task = Some(task);
    Ok(())
  }

  /// Stop pulling from the source until [`CollectProcessor::start`] is
  /// called again.
  pub fn pause(&self) -> Result<()> {
    let mut state = self.state.lock();
    if state.disposed {
      return Err(ProcessorError::Disposed(Stage::Collect));
    }
    if state.running && !state.paused {
      state.paused = true;
      log::debug!("collect paused");
    }
    Ok(())
  }

  pub fn dispose(&self) {
    let mut state = self.state.lock();
    if state.disposed {
      return;
    }
    state.disposed = true;
    state.running = false;
    state.paused = false;
    state.controller.cancel();
    if let Some(task) = state.task.take() {
      task.abort();
    }
    self.resume.notify_waiters();
    log::debug!("collect processor disposed");
  }
}

impl Drop for CollectProcessor {
  fn drop(&mut self) {
    self.dispose();
  }
}

async fn run(
  state: Arc<Mutex<CollectState>>,
  resume: Arc<Notify>,
  config: CollectConfig,
  sender: EventSender,
  source: Arc<dyn Source>,
  params: CollectParams,
  handle: TaskHandle,
) {
  let emitter = Emitter::new(sender, handle.clone());
  emitter.emit(Event::CollectStarted);

  let result = collect_items(&state, &resume, &config, &emitter, source, &params, &handle).await;
  match result {
    Ok(true) => emitter.emit(Event::CollectSucceeded),
    Ok(false) => log::debug!("collect canceled"),
    Err(err) => {
      log::error!("source failed: {err:#}");
      emitter.emit(Event::CollectFailed { err: Arc::new(err) });
    },
  }

  let mut state = state.lock();
  if !handle.is_canceled() {
    state.running = false;
    state.paused = false;
  }
}

/// Returns `false` when canceled.
async fn collect_items(
  state: &Mutex<CollectState>,
  resume: &Notify,
  config: &CollectConfig,
  emitter: &Emitter,
  source: Arc<dyn Source>,
  params: &CollectParams,
  handle: &TaskHandle,
) -> anyhow::Result<bool> {
  let mut stream = source.collect(params, handle.clone());
  let mut chunker = Chunker::new(config.chunk_size)?;
  let mut next_id = 0;

  let outcome = loop {
    if !wait_while_paused(state, resume, handle).await {
      return Ok(false);
    }
    let Some(next) = cancelable_future(stream.next(), handle).await else {
      return Ok(false);
    };
    let item = match next {
      Some(Ok(item)) => item,
      Some(Err(err)) => break Err(err),
      None => break Ok(()),
    };

    let full = chunker.put(Arc::new(Item::from_source(next_id, item)))?;
    next_id += 1;
    if full {
      flush(state, &mut chunker, handle);
      emitter.emit(Event::CollectUpdated);
    }
    if next_id >= config.threshold {
      log::info!("collect truncated at {} items", config.threshold);
      state.lock().truncated = true;
      break Ok(());
    }
    if full && !chunk_pause(config.chunk_interval(), handle).await {
      return Ok(false);
    }
  };

  // keep what arrived before a source error
  flush(state, &mut chunker, handle);
  outcome.map(|()| !handle.is_canceled())
}

fn flush(state: &Mutex<CollectState>, chunker: &mut Chunker<Arc<Item>>, handle: &TaskHandle) {
  if chunker.is_empty() || handle.is_canceled() {
    return;
  }
  let chunk = chunker.consume();
  Arc::make_mut(&mut state.lock().items).extend(chunk);
}

/// Block while the collection is paused. Returns `false` when canceled.
async fn wait_while_paused(
  state: &Mutex<CollectState>,
  resume: &Notify,
  handle: &TaskHandle,
) -> bool {
  loop {
    let notified = resume.notified();
    tokio::pin!(notified);
    notified.as_mut().enable();
    if handle.is_canceled() {
      return false;
    }
    if !state.lock().paused {
      return true;
    }
    if cancelable_future(notified, handle).await.is_none() {
      return false;
    }
  }
}
