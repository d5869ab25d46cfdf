use std::{
  cmp::Ordering,
  sync::Arc,
};

use async_trait::async_trait;
use the_event::TaskHandle;

use crate::{
  extension::Sorter,
  item::Item,
};

/// Orders by label, ties broken by collection order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalSorter {
  reverse: bool,
}

impl LexicalSorter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reversed() -> Self {
    Self { reverse: true }
  }
}

#[async_trait]
impl Sorter for LexicalSorter {
  async fn sort(&self, items: &mut Vec<Arc<Item>>, _cancel: &TaskHandle) -> anyhow::Result<()> {
    items.sort_by(|left, right| {
      let ordering = left.label().cmp(right.label());
      let ordering = if self.reverse {
        ordering.reverse()
      } else {
        ordering
      };
      ordering.then(left.id.cmp(&right.id))
    });
    Ok(())
  }
}

/// Shortest label first; useful for path pickers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthSorter;

#[async_trait]
impl Sorter for LengthSorter {
  async fn sort(&self, items: &mut Vec<Arc<Item>>, _cancel: &TaskHandle) -> anyhow::Result<()> {
    items.sort_by(|left, right| by_length(left, right).then(left.id.cmp(&right.id)));
    Ok(())
  }
}

fn by_length(left: &Item, right: &Item) -> Ordering {
  left.label().chars().count().cmp(&right.label().chars().count())
}
