use async_trait::async_trait;
use the_event::TaskHandle;
use unicode_width::UnicodeWidthChar;

use crate::{
  extension::Renderer,
  item::{
    Decoration,
    DisplayItem,
  },
};

const ELLIPSIS: char = '…';

/// Fits labels into the available columns, ending cut labels with `…`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelRenderer;

#[async_trait]
impl Renderer for LabelRenderer {
  async fn render(
    &self,
    mut items: Vec<DisplayItem>,
    width: usize,
    _cancel: &TaskHandle,
  ) -> anyhow::Result<Vec<DisplayItem>> {
    for item in &mut items {
      truncate(item, width);
    }
    Ok(items)
  }
}

fn truncate(item: &mut DisplayItem, width: usize) {
  if width == 0 || unicode_width::UnicodeWidthStr::width(item.label.as_str()) <= width {
    return;
  }

  let budget = width - 1;
  let mut used = 0;
  let mut cut = 0;
  for (column, ch) in item.label.char_indices() {
    let ch_width = ch.width().unwrap_or(0);
    if used + ch_width > budget {
      break;
    }
    used += ch_width;
    cut = column + ch.len_utf8();
  }

  item.label.truncate(cut);
  item.label.push(ELLIPSIS);
  item.decorations = clip(&item.decorations, cut);
}

fn clip(decorations: &[Decoration], end: usize) -> Vec<Decoration> {
  decorations
    .iter()
    .filter(|decoration| decoration.column < end)
    .map(|decoration| {
      let mut decoration = decoration.clone();
      decoration.length = decoration.length.min(end - decoration.column);
      decoration
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::item::Item;

  async fn render(label: &str, decorations: Vec<Decoration>, width: usize) -> DisplayItem {
    let mut item = Item::new(0, label);
    item.decorations = decorations;
    let rendered = LabelRenderer
      .render(vec![DisplayItem::from(&item)], width, &TaskHandle::detached())
      .await
      .unwrap();
    rendered.into_iter().next().unwrap()
  }

  #[tokio::test(flavor = "current_thread")]
  async fn short_labels_are_untouched() {
    assert_eq!(render("short", Vec::new(), 10).await.label, "short");
    assert_eq!(render("exactly10!", Vec::new(), 10).await.label, "exactly10!");
  }

  #[tokio::test(flavor = "current_thread")]
  async fn long_labels_end_with_ellipsis() {
    let item = render("a-very-long-label", Vec::new(), 8).await;
    assert_eq!(item.label, "a-very-…");
  }

  #[tokio::test(flavor = "current_thread")]
  async fn wide_characters_count_double() {
    let item = render("日本語テキスト", Vec::new(), 6).await;
    assert_eq!(item.label, "日本…");
  }

  #[tokio::test(flavor = "current_thread")]
  async fn decorations_are_clipped_to_the_kept_text() {
    let decorations = vec![Decoration::new(0, 2), Decoration::new(3, 4), Decoration::new(9, 2)];
    let item = render("abcdefghijkl", decorations, 6).await;
    assert_eq!(item.label, "abcde…");
    assert_eq!(item.decorations, [Decoration::new(0, 2), Decoration::new(3, 2)]);
  }
}
