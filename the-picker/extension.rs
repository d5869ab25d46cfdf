//! Contracts of the pluggable pieces the pipeline orchestrates.
//!
//! Implementations receive a [`TaskHandle`] and should stop promptly once it
//! is canceled. The processors do not rely on that: a canceled invocation's
//! stream or future is dropped at its next suspension point.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use the_event::TaskHandle;

use crate::item::{
  DisplayItem,
  Item,
  ItemList,
  PreviewItem,
  SourceItem,
};

/// Invocation parameters handed to a [`Source`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectParams {
  pub args: Vec<String>,
}

impl CollectParams {
  pub fn new<I, S>(args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      args: args.into_iter().map(Into::into).collect(),
    }
  }
}

/// Produces the raw candidates. The stream may be endless.
pub trait Source: Send + Sync {
  fn collect(
    &self,
    params: &CollectParams,
    cancel: TaskHandle,
  ) -> BoxStream<'static, anyhow::Result<SourceItem>>;
}

/// Narrows (and possibly reorders) the collected items by the query.
pub trait Matcher: Send + Sync {
  /// Whether partial results are meaningful to show while matching.
  fn incremental(&self) -> bool {
    false
  }

  /// Items passed through unchanged should be yielded as the same `Arc`.
  fn match_items(
    &self,
    items: ItemList,
    query: &str,
    cancel: TaskHandle,
  ) -> BoxStream<'static, anyhow::Result<Arc<Item>>>;
}

/// Reorders matched items in place.
#[async_trait]
pub trait Sorter: Send + Sync {
  async fn sort(&self, items: &mut Vec<Arc<Item>>, cancel: &TaskHandle) -> anyhow::Result<()>;
}

/// Decorates the visible slice. Must return exactly as many items as given.
#[async_trait]
pub trait Renderer: Send + Sync {
  async fn render(
    &self,
    items: Vec<DisplayItem>,
    width: usize,
    cancel: &TaskHandle,
  ) -> anyhow::Result<Vec<DisplayItem>>;
}

#[async_trait]
pub trait Previewer: Send + Sync {
  async fn preview(&self, item: &Item, cancel: &TaskHandle) -> anyhow::Result<Option<PreviewItem>>;
}
