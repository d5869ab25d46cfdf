use anyhow::anyhow;
use futures_util::{
  StreamExt,
  stream::{
    self,
    BoxStream,
  },
};
use parking_lot::Mutex;
use the_event::TaskHandle;
use tokio::io::{
  AsyncBufRead,
  AsyncBufReadExt,
};

use crate::{
  extension::{
    CollectParams,
    Source,
  },
  item::SourceItem,
};

/// Serves a fixed list of items, again on every collection.
#[derive(Debug, Clone, Default)]
pub struct ListSource {
  items: Vec<SourceItem>,
}

impl ListSource {
  pub fn new<I, T>(items: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<SourceItem>,
  {
    Self {
      items: items.into_iter().map(Into::into).collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

impl Source for ListSource {
  fn collect(
    &self,
    _params: &CollectParams,
    _cancel: TaskHandle,
  ) -> BoxStream<'static, anyhow::Result<SourceItem>> {
    stream::iter(self.items.clone().into_iter().map(Ok)).boxed()
  }
}

/// One item per non-empty line of a reader, e.g. stdin.
///
/// A reader can only be consumed once; collecting again fails.
pub struct LinesSource<R> {
  reader: Mutex<Option<R>>,
}

impl<R> LinesSource<R>
where
  R: AsyncBufRead + Unpin + Send + 'static,
{
  pub fn new(reader: R) -> Self {
    Self {
      reader: Mutex::new(Some(reader)),
    }
  }
}

impl<R> Source for LinesSource<R>
where
  R: AsyncBufRead + Unpin + Send + 'static,
{
  fn collect(
    &self,
    _params: &CollectParams,
    _cancel: TaskHandle,
  ) -> BoxStream<'static, anyhow::Result<SourceItem>> {
    let Some(reader) = self.reader.lock().take() else {
      return stream::once(async { Err(anyhow!("input was already consumed")) }).boxed();
    };

    stream::unfold(Some(reader.lines()), |lines| async move {
      let mut lines = lines?;
      loop {
        match lines.next_line().await {
          Ok(Some(line)) if line.is_empty() => continue,
          Ok(Some(line)) => return Some((Ok(SourceItem::new(line)), Some(lines))),
          Ok(None) => return None,
          Err(err) => return Some((Err(err.into()), None)),
        }
      }
    })
    .boxed()
  }
}
