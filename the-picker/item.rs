//! Items flowing through the pipeline.
//!
//! Collected items are immutable and shared as `Arc<Item>`: the stages pass
//! pointers around, and only a matcher that changes decorations allocates a
//! new item.

use std::sync::Arc;

use serde::{
  Deserialize,
  Serialize,
};

/// Stable key of a collected item, assigned in collection order.
pub type ItemId = usize;

/// Snapshot of a stage's output.
pub type ItemList = Arc<Vec<Arc<Item>>>;

/// A highlighted span of an item's label.
///
/// `column` is a byte offset into the label and `length` a byte length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
  pub column:    usize,
  pub length:    usize,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub highlight: Option<String>,
}

impl Decoration {
  pub fn new(column: usize, length: usize) -> Self {
    Self {
      column,
      length,
      highlight: None,
    }
  }

  pub fn with_highlight(mut self, highlight: impl Into<String>) -> Self {
    self.highlight = Some(highlight.into());
    self
  }
}

/// A raw record produced by a [`Source`](crate::Source), before it has an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
  pub value:       String,
  #[serde(default)]
  pub detail:      serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label:       Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub decorations: Vec<Decoration>,
}

impl SourceItem {
  pub fn new(value: impl Into<String>) -> Self {
    Self {
      value: value.into(),
      ..Self::default()
    }
  }

  pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
    self.detail = detail;
    self
  }
}

impl From<String> for SourceItem {
  fn from(value: String) -> Self {
    Self::new(value)
  }
}

impl From<&str> for SourceItem {
  fn from(value: &str) -> Self {
    Self::new(value)
  }
}

/// A collected candidate.
///
/// The id never changes once collection assigned it; matchers may replace the
/// decorations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
  pub id:          ItemId,
  pub value:       String,
  #[serde(default)]
  pub detail:      serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label:       Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub decorations: Vec<Decoration>,
}

impl Item {
  pub fn new(id: ItemId, value: impl Into<String>) -> Self {
    Self::from_source(id, SourceItem::new(value))
  }

  pub fn from_source(id: ItemId, source: SourceItem) -> Self {
    Self {
      id,
      value: source.value,
      detail: source.detail,
      label: source.label,
      decorations: source.decorations,
    }
  }

  /// The label to display, falling back to the value.
  pub fn label(&self) -> &str {
    self.label.as_deref().unwrap_or(&self.value)
  }
}

/// An item prepared for the visible list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayItem {
  pub id:          ItemId,
  pub value:       String,
  #[serde(default)]
  pub detail:      serde_json::Value,
  pub label:       String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub decorations: Vec<Decoration>,
}

impl From<&Item> for DisplayItem {
  fn from(item: &Item) -> Self {
    Self {
      id:          item.id,
      value:       item.value.clone(),
      detail:      item.detail.clone(),
      label:       item.label().to_owned(),
      decorations: item.decorations.clone(),
    }
  }
}

/// Preview content for a single item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewItem {
  pub content:  Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub filename: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub filetype: Option<String>,
  /// 1-based line to reveal.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub line:     Option<usize>,
  /// 1-based column to reveal.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub column:   Option<usize>,
}

impl PreviewItem {
  pub fn from_lines<I, S>(lines: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      content: lines.into_iter().map(Into::into).collect(),
      ..Self::default()
    }
  }
}
