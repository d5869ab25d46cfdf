use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use the_event::TaskHandle;

use crate::{
  extension::Previewer,
  item::{
    Item,
    PreviewItem,
  },
};

/// Shows an item's detail as pretty-printed JSON.
///
/// `path`, `line` and `column` keys of an object detail are forwarded to the
/// preview position. Items without detail have no preview.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetailPreviewer;

#[async_trait]
impl Previewer for DetailPreviewer {
  async fn preview(
    &self,
    item: &Item,
    _cancel: &TaskHandle,
  ) -> anyhow::Result<Option<PreviewItem>> {
    if item.detail.is_null() {
      return Ok(None);
    }

    let text = serde_json::to_string_pretty(&item.detail)
      .with_context(|| format!("failed to format detail of item {}", item.id))?;
    let mut preview = PreviewItem::from_lines(text.lines());
    preview.filetype = Some("json".into());
    preview.filename = item.detail.get("path").and_then(Value::as_str).map(Into::into);
    preview.line = position(&item.detail, "line");
    preview.column = position(&item.detail, "column");
    Ok(Some(preview))
  }
}

fn position(detail: &Value, key: &str) -> Option<usize> {
  detail
    .get(key)
    .and_then(Value::as_u64)
    .and_then(|value| usize::try_from(value).ok())
}
