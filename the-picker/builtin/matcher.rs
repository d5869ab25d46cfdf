//! Query matchers.
//!
//! [`SubstringMatcher`] keeps the collected order and streams matches as it
//! finds them. [`FuzzyMatcher`] ranks by [`nucleo`] score, so it only yields
//! once every item was scored.
//!
//! Both use smart case: a query without uppercase characters matches
//! case-insensitively.

use std::sync::Arc;

use futures_util::{
  StreamExt,
  stream::{
    self,
    BoxStream,
  },
};
use nucleo::{
  Config,
  Utf32Str,
  pattern::{
    CaseMatching,
    Normalization,
    Pattern,
  },
};
use the_event::TaskHandle;

use crate::{
  extension::Matcher,
  item::{
    Decoration,
    Item,
    ItemList,
  },
};

/// Items scored between two scheduler yields.
const SCORE_BATCH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
  #[default]
  Plain,
  /// Favors matches right after path separators.
  Path,
}

/// Whitespace-separated terms that must all occur in the value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl Matcher for SubstringMatcher {
  fn incremental(&self) -> bool {
    true
  }

  fn match_items(
    &self,
    items: ItemList,
    query: &str,
    _cancel: TaskHandle,
  ) -> BoxStream<'static, anyhow::Result<Arc<Item>>> {
    let ignore_case = !query.chars().any(char::is_uppercase);
    let terms: Vec<String> = query
      .split_whitespace()
      .map(|term| {
        if ignore_case {
          term.to_lowercase()
        } else {
          term.to_owned()
        }
      })
      .collect();

    stream::iter((0..items.len()).filter_map(move |index| {
      let item = &items[index];
      substring_match(item, &terms, ignore_case).map(Ok)
    }))
    .boxed()
  }
}

fn substring_match(item: &Arc<Item>, terms: &[String], ignore_case: bool) -> Option<Arc<Item>> {
  if terms.is_empty() {
    return Some(Arc::clone(item));
  }

  let lowered;
  let haystack = if ignore_case {
    lowered = item.value.to_lowercase();
    &lowered
  } else {
    &item.value
  };

  let mut decorations = Vec::with_capacity(terms.len());
  for term in terms {
    let column = haystack.find(term.as_str())?;
    decorations.push(Decoration::new(column, term.len()));
  }

  // offsets refer to the value; they mean nothing on a custom label or once
  // lowercasing changed byte lengths
  if item.label.is_some() || haystack.len() != item.value.len() {
    return Some(Arc::clone(item));
  }
  decorations.sort_by_key(|decoration| decoration.column);
  let mut matched = Item::clone(item);
  matched.decorations = decorations;
  Some(Arc::new(matched))
}

/// Fuzzy matching powered by [`nucleo`], best score first.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyMatcher {
  mode: MatchMode,
}

impl FuzzyMatcher {
  pub fn new(mode: MatchMode) -> Self {
    Self { mode }
  }

  pub fn mode(&self) -> MatchMode {
    self.mode
  }

  fn config(&self) -> Config {
    let mut config = Config::DEFAULT;
    if self.mode == MatchMode::Path {
      config.set_match_paths();
    }
    config
  }
}

impl Matcher for FuzzyMatcher {
  fn match_items(
    &self,
    items: ItemList,
    query: &str,
    cancel: TaskHandle,
  ) -> BoxStream<'static, anyhow::Result<Arc<Item>>> {
    if query.trim().is_empty() {
      return stream::iter((0..items.len()).map(move |index| Ok(Arc::clone(&items[index]))))
        .boxed();
    }

    let pattern = Pattern::parse(query, CaseMatching::Smart, Normalization::Smart);
    let config = self.config();
    stream::once(async move {
      let ranked = rank(&items, &pattern, config, &cancel).await;
      stream::iter(ranked.into_iter().map(Ok))
    })
    .flatten()
    .boxed()
  }
}

async fn rank(
  items: &[Arc<Item>],
  pattern: &Pattern,
  config: Config,
  cancel: &TaskHandle,
) -> Vec<Arc<Item>> {
  let mut matcher = nucleo::Matcher::new(config);
  let mut buf = Vec::new();
  let mut indices = Vec::new();
  let mut scored = Vec::new();

  for (position, item) in items.iter().enumerate() {
    if position > 0 && position % SCORE_BATCH == 0 {
      tokio::task::yield_now().await;
      if cancel.is_canceled() {
        return Vec::new();
      }
    }

    indices.clear();
    let haystack = Utf32Str::new(&item.value, &mut buf);
    let Some(score) = pattern.indices(haystack, &mut matcher, &mut indices) else {
      continue;
    };

    let matched = if item.label.is_none() {
      indices.sort_unstable();
      indices.dedup();
      let mut decorated = Item::clone(item);
      decorated.decorations = decorations(&item.value, &indices);
      Arc::new(decorated)
    } else {
      Arc::clone(item)
    };
    scored.push((score, matched));
  }

  scored.sort_by(|(a, left), (b, right)| b.cmp(a).then(left.id.cmp(&right.id)));
  scored.into_iter().map(|(_, item)| item).collect()
}

/// Turn sorted char indices into byte-range decorations, merging neighbours.
fn decorations(value: &str, indices: &[u32]) -> Vec<Decoration> {
  let mut decorations: Vec<Decoration> = Vec::new();
  let mut wanted = indices.iter().map(|&index| index as usize).peekable();

  for (char_index, (column, ch)) in value.char_indices().enumerate() {
    let Some(&next) = wanted.peek() else {
      break;
    };
    if char_index != next {
      continue;
    }
    wanted.next();

    match decorations.last_mut() {
      Some(last) if last.column + last.length == column => last.length += ch.len_utf8(),
      _ => decorations.push(Decoration::new(column, ch.len_utf8())),
    }
  }
  decorations
}
