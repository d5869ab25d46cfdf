use std::{
  sync::Arc,
  time::Duration,
};

use futures_util::{
  StreamExt,
  stream::{
    self,
    BoxStream,
  },
};
use parking_lot::Mutex;
use the_picker::{
  CollectParams,
  EventBus,
  Item,
  ItemList,
  Matcher,
  Source,
  SourceItem,
  TaskHandle,
};
use tokio::sync::{
  Notify,
  mpsc,
};

/// Poll `done` until it holds, failing the test after about two seconds.
pub async fn wait_until(mut done: impl FnMut() -> bool) {
  for _ in 0..1000 {
    if done() {
      return;
    }
    tokio::time::sleep(Duration::from_millis(2)).await;
  }
  panic!("condition not reached in time");
}

/// Names of the events waiting on the bus, in delivery order.
pub fn drain(bus: &EventBus) -> Vec<&'static str> {
  let mut names = Vec::new();
  bus.consume(|event| names.push(event.name()));
  names
}

pub fn values(items: &[Arc<Item>]) -> Vec<&str> {
  items.iter().map(|item| item.value.as_str()).collect()
}

pub fn item_list(values: &[&str]) -> ItemList {
  Arc::new(
    values
      .iter()
      .enumerate()
      .map(|(id, value)| Arc::new(Item::new(id, *value)))
      .collect(),
  )
}

/// Passes everything through and records the queries it was invoked with.
/// Streams stay open until the gate is opened when one is set.
#[derive(Default)]
pub struct RecordingMatcher {
  pub queries: Mutex<Vec<String>>,
  pub gate:    Option<Arc<Notify>>,
}

impl RecordingMatcher {
  pub fn gated(gate: Arc<Notify>) -> Self {
    Self {
      queries: Mutex::default(),
      gate:    Some(gate),
    }
  }

  pub fn queries(&self) -> Vec<String> {
    self.queries.lock().clone()
  }
}

impl Matcher for RecordingMatcher {
  fn match_items(
    &self,
    items: ItemList,
    query: &str,
    _cancel: TaskHandle,
  ) -> BoxStream<'static, anyhow::Result<Arc<Item>>> {
    self.queries.lock().push(query.to_owned());
    let matched = stream::iter(Vec::clone(&items).into_iter().map(Ok));
    match self.gate.clone() {
      Some(gate) => {
        let closed = stream::once(async move { gate.notified().await })
          .filter_map(|()| async { None::<anyhow::Result<Arc<Item>>> });
        matched.chain(closed).boxed()
      },
      None => matched.boxed(),
    }
  }
}

/// Fails every run without yielding anything.
pub struct FailingMatcher;

impl Matcher for FailingMatcher {
  fn match_items(
    &self,
    _items: ItemList,
    _query: &str,
    _cancel: TaskHandle,
  ) -> BoxStream<'static, anyhow::Result<Arc<Item>>> {
    stream::once(async { Err(anyhow::anyhow!("matcher exploded")) }).boxed()
  }
}

/// Source fed by a channel, for driving collection by hand.
pub struct ChannelSource {
  receiver: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl ChannelSource {
  pub fn new() -> (Self, mpsc::UnboundedSender<String>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let source = Self {
      receiver: Mutex::new(Some(receiver)),
    };
    (source, sender)
  }
}

impl Source for ChannelSource {
  fn collect(
    &self,
    _params: &CollectParams,
    _cancel: TaskHandle,
  ) -> BoxStream<'static, anyhow::Result<SourceItem>> {
    let Some(receiver) = self.receiver.lock().take() else {
      return stream::empty().boxed();
    };
    stream::unfold(receiver, |mut receiver| async move {
      let value = receiver.recv().await?;
      Some((Ok(SourceItem::new(value)), receiver))
    })
    .boxed()
  }
}
