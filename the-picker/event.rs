//! Events exchanged between the editor, the stages and the picker.
//!
//! Input events come from the editor side (query line, cursor keys,
//! selection toggles). Lifecycle events come from the stages: for one stage
//! invocation `*Started` is sent at most once, `*Updated` any number of
//! times, and exactly one of `*Succeeded` / `*Failed` ends it unless the
//! invocation was canceled.

use crate::error::ExtensionError;

/// How a selection event changes the selection set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMethod {
  On,
  Off,
  #[default]
  Toggle,
}

#[derive(Debug, Clone)]
pub enum Event {
  /// The query line changed.
  CmdlineChanged { query: String },
  /// Move the cursor by `amount`, wrapping around when `cycle` is set.
  MoveCursor { amount: isize, cycle: bool },
  /// Put the cursor on an absolute position (clamped).
  MoveCursorAt { cursor: usize },
  /// Change the selection of the item at `cursor` (the current item when
  /// `None`).
  SelectItem {
    cursor: Option<usize>,
    method: SelectMethod,
  },
  /// Change the selection of every matched item.
  SelectAllItems { method: SelectMethod },
  SwitchMatcher { amount: isize, cycle: bool },
  SwitchMatcherAt { index: usize },
  SwitchSorter { amount: isize, cycle: bool },
  SwitchSorterAt { index: usize },
  SwitchRenderer { amount: isize, cycle: bool },
  SwitchRendererAt { index: usize },
  SwitchPreviewer { amount: isize, cycle: bool },
  SwitchPreviewerAt { index: usize },
  CollectPause,
  CollectResume,

  CollectStarted,
  CollectUpdated,
  CollectSucceeded,
  CollectFailed { err: ExtensionError },

  MatchStarted,
  MatchUpdated,
  MatchSucceeded,
  MatchFailed { err: ExtensionError },

  SortStarted,
  SortSucceeded,
  SortFailed { err: ExtensionError },

  RenderStarted,
  RenderSucceeded,
  RenderFailed { err: ExtensionError },

  PreviewStarted,
  PreviewSucceeded,
  PreviewFailed { err: ExtensionError },
}

impl Event {
  /// Short kebab-case name, used in logs.
  pub fn name(&self) -> &'static str {
    match self {
      Self::CmdlineChanged { .. } => "cmdline-changed",
      Self::MoveCursor { .. } => "move-cursor",
      Self::MoveCursorAt { .. } => "move-cursor-at",
      Self::SelectItem { .. } => "select-item",
      Self::SelectAllItems { .. } => "select-all-items",
      Self::SwitchMatcher { .. } => "switch-matcher",
      Self::SwitchMatcherAt { .. } => "switch-matcher-at",
      Self::SwitchSorter { .. } => "switch-sorter",
      Self::SwitchSorterAt { .. } => "switch-sorter-at",
      Self::SwitchRenderer { .. } => "switch-renderer",
      Self::SwitchRendererAt { .. } => "switch-renderer-at",
      Self::SwitchPreviewer { .. } => "switch-previewer",
      Self::SwitchPreviewerAt { .. } => "switch-previewer-at",
      Self::CollectPause => "collect-pause",
      Self::CollectResume => "collect-resume",
      Self::CollectStarted => "collect-started",
      Self::CollectUpdated => "collect-updated",
      Self::CollectSucceeded => "collect-succeeded",
      Self::CollectFailed { .. } => "collect-failed",
      Self::MatchStarted => "match-started",
      Self::MatchUpdated => "match-updated",
      Self::MatchSucceeded => "match-succeeded",
      Self::MatchFailed { .. } => "match-failed",
      Self::SortStarted => "sort-started",
      Self::SortSucceeded => "sort-succeeded",
      Self::SortFailed { .. } => "sort-failed",
      Self::RenderStarted => "render-started",
      Self::RenderSucceeded => "render-succeeded",
      Self::RenderFailed { .. } => "render-failed",
      Self::PreviewStarted => "preview-started",
      Self::PreviewSucceeded => "preview-succeeded",
      Self::PreviewFailed { .. } => "preview-failed",
    }
  }
}

pub type EventBus = the_event::EventBus<Event>;
pub type EventSender = the_event::EventSender<Event>;
