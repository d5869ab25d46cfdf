//! An ordered collection with a clamped "current" position.

/// Ordered items plus the index of the current one.
///
/// The index always stays within `0..len` (or `0` when empty), whether the
/// items or the index change.
#[derive(Debug, Clone)]
pub struct ItemBelt<T> {
  items: Vec<T>,
  index: usize,
}

impl<T> Default for ItemBelt<T> {
  fn default() -> Self {
    Self {
      items: Vec::new(),
      index: 0,
    }
  }
}

impl<T> ItemBelt<T> {
  pub fn new(items: Vec<T>) -> Self {
    Self { items, index: 0 }
  }

  pub fn current(&self) -> Option<&T> {
    self.items.get(self.index)
  }

  pub fn count(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn items(&self) -> &[T] {
    &self.items
  }

  pub fn set_items(&mut self, items: Vec<T>) {
    self.items = items;
    self.index = clamp(self.index as isize, self.items.len());
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn set_index(&mut self, index: isize) {
    self.index = clamp(index, self.items.len());
  }

  /// Move the current index by `offset`.
  ///
  /// With `cycle` the index wraps around modulo the item count, otherwise it
  /// stops at either end.
  pub fn select(&mut self, offset: isize, cycle: bool) {
    self.index = step_index(self.index, offset, self.items.len(), cycle);
  }
}

/// Move `index` by `offset` within `0..len`, wrapping when `cycle` is set
/// and clamping otherwise. An empty range always yields `0`.
pub fn step_index(index: usize, offset: isize, len: usize, cycle: bool) -> usize {
  if len == 0 {
    return 0;
  }
  let target = index as isize + offset;
  if cycle {
    target.rem_euclid(len as isize) as usize
  } else {
    clamp(target, len)
  }
}

fn clamp(index: isize, len: usize) -> usize {
  if len == 0 {
    return 0;
  }
  index.clamp(0, len as isize - 1) as usize
}
