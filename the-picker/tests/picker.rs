mod common;

use std::{
  sync::{
    Arc,
    atomic::{
      AtomicUsize,
      Ordering,
    },
  },
  time::Duration,
};

use async_trait::async_trait;
use common::{
  ChannelSource,
  FailingMatcher,
  RecordingMatcher,
  values,
};
use serde_json::json;
use the_picker::{
  DisplayItem,
  Dirty,
  Event,
  Extensions,
  Item,
  Matcher,
  Picker,
  PickerConfig,
  PickerError,
  PreviewItem,
  Previewer,
  Renderer,
  SelectMethod,
  Sorter,
  SourceItem,
  TaskHandle,
  builtin::{
    DetailPreviewer,
    LabelRenderer,
    LexicalSorter,
    ListSource,
    SubstringMatcher,
  },
};
use tokio::sync::Notify;

fn config() -> PickerConfig {
  let mut config = PickerConfig::default();
  config.tick_interval_ms = 1;
  config.collect.chunk_size = 3;
  config.matching.chunk_size = 3;
  config.render.height = 5;
  config
}

fn numbered(count: usize) -> ListSource {
  ListSource::new((0..count).map(|n| format!("item {n:02}")))
}

fn picker(extensions: Extensions) -> Picker {
  Picker::new(extensions, config()).unwrap()
}

async fn settle(picker: &mut Picker) {
  tokio::time::timeout(Duration::from_secs(5), picker.run_until_idle())
    .await
    .expect("picker did not settle")
    .unwrap();
}

async fn tick_until(picker: &mut Picker, mut done: impl FnMut(&Picker) -> bool) {
  for _ in 0..1000 {
    picker.tick().unwrap();
    if done(picker) {
      return;
    }
    tokio::time::sleep(Duration::from_millis(2)).await;
  }
  panic!("condition not reached in time");
}

fn labels(items: &[DisplayItem]) -> Vec<&str> {
  items.iter().map(|item| item.label.as_str()).collect()
}

struct FailingSorter;

#[async_trait]
impl Sorter for FailingSorter {
  async fn sort(&self, _items: &mut Vec<Arc<Item>>, _cancel: &TaskHandle) -> anyhow::Result<()> {
    anyhow::bail!("sorter exploded")
  }
}

/// Keeps the matched order and counts its runs.
#[derive(Default)]
struct CountingSorter {
  calls: AtomicUsize,
}

#[async_trait]
impl Sorter for CountingSorter {
  async fn sort(&self, _items: &mut Vec<Arc<Item>>, _cancel: &TaskHandle) -> anyhow::Result<()> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

struct UppercaseRenderer;

#[async_trait]
impl Renderer for UppercaseRenderer {
  async fn render(
    &self,
    mut items: Vec<DisplayItem>,
    _width: usize,
    _cancel: &TaskHandle,
  ) -> anyhow::Result<Vec<DisplayItem>> {
    for item in &mut items {
      item.label = item.label.to_uppercase();
    }
    Ok(items)
  }
}

#[derive(Default)]
struct CountingPreviewer {
  calls: AtomicUsize,
}

#[async_trait]
impl Previewer for CountingPreviewer {
  async fn preview(
    &self,
    item: &Item,
    _cancel: &TaskHandle,
  ) -> anyhow::Result<Option<PreviewItem>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(Some(PreviewItem::from_lines([item.value.clone()])))
  }
}

struct FailingPreviewer;

#[async_trait]
impl Previewer for FailingPreviewer {
  async fn preview(
    &self,
    _item: &Item,
    _cancel: &TaskHandle,
  ) -> anyhow::Result<Option<PreviewItem>> {
    anyhow::bail!("previewer exploded")
  }
}

struct DroppingRenderer;

#[async_trait]
impl Renderer for DroppingRenderer {
  async fn render(
    &self,
    mut items: Vec<DisplayItem>,
    _width: usize,
    _cancel: &TaskHandle,
  ) -> anyhow::Result<Vec<DisplayItem>> {
    items.pop();
    Ok(items)
  }
}

#[tokio::test(flavor = "current_thread")]
async fn query_flows_through_every_stage() {
  let source = ListSource::new([
    "signal 0 even",
    "signal 1 odd",
    "signal 2 even",
    "signal 3 odd",
    "signal 4 even",
  ]);
  let mut extensions = Extensions::new(Arc::new(source), Arc::new(SubstringMatcher));
  extensions.renderers = vec![Arc::new(LabelRenderer)];
  let mut picker = picker(extensions).with_query("even");

  picker.open().unwrap();
  settle(&mut picker).await;

  let view = picker.view();
  assert_eq!(view.query, "even");
  assert_eq!(view.collected, 5);
  assert_eq!(view.matched, 3);
  assert!(!view.truncated);
  assert_eq!(labels(&view.items), [
    "signal 0 even",
    "signal 2 even",
    "signal 4 even",
  ]);
  assert_eq!(view.cursor, 0);
  assert_eq!(view.line, 1);
  assert!(!view.progress.processing());
  assert!(!view.progress.failed());
  assert_eq!(picker.current_item().map(|item| item.id), Some(0));
}

#[tokio::test(flavor = "current_thread")]
async fn changing_the_query_rematches() {
  let mut picker = picker(Extensions::new(Arc::new(numbered(12)), Arc::new(SubstringMatcher)));
  picker.open().unwrap();
  settle(&mut picker).await;
  assert_eq!(picker.view().matched, 12);

  picker.sender().dispatch(Event::CmdlineChanged {
    query: "item 1".into(),
  });
  let dirty = picker.tick().unwrap();
  assert!(dirty.contains(Dirty::QUERY));
  settle(&mut picker).await;

  assert_eq!(values(&picker.matched_items()), ["item 10", "item 11"]);
  assert_eq!(picker.view().matched, 2);
}

#[tokio::test(flavor = "current_thread")]
async fn cursor_moves_scroll_the_window() {
  let mut picker = picker(Extensions::new(Arc::new(numbered(20)), Arc::new(SubstringMatcher)));
  picker.open().unwrap();
  settle(&mut picker).await;

  picker.sender().dispatch(Event::MoveCursor {
    amount: 7,
    cycle:  false,
  });
  settle(&mut picker).await;
  let view = picker.view();
  assert_eq!(view.cursor, 7);
  assert_eq!(view.line, 4);
  assert_eq!(labels(&view.items), [
    "item 04", "item 05", "item 06", "item 07", "item 08"
  ]);

  picker.sender().dispatch(Event::MoveCursor {
    amount: 100,
    cycle:  false,
  });
  settle(&mut picker).await;
  assert_eq!(picker.view().cursor, 19);

  picker.sender().dispatch(Event::MoveCursor {
    amount: 1,
    cycle:  true,
  });
  settle(&mut picker).await;
  let view = picker.view();
  assert_eq!(view.cursor, 0);
  assert_eq!(view.line, 1);

  picker.sender().dispatch(Event::MoveCursorAt { cursor: 12 });
  settle(&mut picker).await;
  assert_eq!(picker.current_item().map(|item| item.id), Some(12));
}

#[tokio::test(flavor = "current_thread")]
async fn selection_only_touches_local_state() {
  let mut picker = picker(Extensions::new(Arc::new(numbered(4)), Arc::new(SubstringMatcher)));
  picker.open().unwrap();
  settle(&mut picker).await;

  // nothing selected falls back to the current item
  let ids: Vec<_> = picker.selected_items().iter().map(|item| item.id).collect();
  assert_eq!(ids, [0]);

  let sender = picker.sender();
  sender.dispatch(Event::SelectItem {
    cursor: Some(2),
    method: SelectMethod::Toggle,
  });
  sender.dispatch(Event::SelectItem {
    cursor: Some(1),
    method: SelectMethod::On,
  });
  let dirty = picker.tick().unwrap();
  assert!(dirty.contains(Dirty::SELECTION));
  assert!(picker.is_idle());
  let ids: Vec<_> = picker.selected_items().iter().map(|item| item.id).collect();
  assert_eq!(ids, [1, 2]);

  sender.dispatch(Event::SelectItem {
    cursor: Some(2),
    method: SelectMethod::Toggle,
  });
  picker.tick().unwrap();
  assert_eq!(picker.selection().len(), 1);

  sender.dispatch(Event::SelectAllItems {
    method: SelectMethod::On,
  });
  picker.tick().unwrap();
  assert_eq!(picker.view().selected.len(), 4);

  sender.dispatch(Event::SelectAllItems {
    method: SelectMethod::Off,
  });
  picker.tick().unwrap();
  assert!(picker.selection().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn failed_sort_shows_the_matched_order() {
  let source = ListSource::new(["pear", "apple", "fig"]);
  let mut extensions = Extensions::new(Arc::new(source), Arc::new(SubstringMatcher));
  extensions.sorters = vec![
    Arc::new(FailingSorter) as Arc<dyn Sorter>,
    Arc::new(LexicalSorter::new()) as Arc<dyn Sorter>,
  ];
  let mut picker = picker(extensions);
  picker.open().unwrap();
  settle(&mut picker).await;

  let view = picker.view();
  assert!(view.progress.sort.failed);
  assert_eq!(labels(&view.items), ["pear", "apple", "fig"]);

  picker.sender().dispatch(Event::SwitchSorter {
    amount: 1,
    cycle:  false,
  });
  settle(&mut picker).await;
  let view = picker.view();
  assert!(!view.progress.sort.failed);
  assert_eq!(labels(&view.items), ["apple", "fig", "pear"]);
}

#[tokio::test(flavor = "current_thread")]
async fn renderer_returning_the_wrong_count_falls_back() {
  let mut extensions = Extensions::new(Arc::new(numbered(3)), Arc::new(SubstringMatcher));
  extensions.renderers = vec![Arc::new(DroppingRenderer)];
  let mut picker = picker(extensions);
  picker.open().unwrap();
  settle(&mut picker).await;

  let view = picker.view();
  assert!(view.progress.render.failed);
  assert_eq!(labels(&view.items), ["item 00", "item 01", "item 02"]);
}

#[tokio::test(flavor = "current_thread")]
async fn preview_follows_the_cursor() {
  let source = ListSource::new([
    SourceItem::new("with detail").with_detail(json!({ "path": "src/lib.rs", "line": 3 })),
    SourceItem::new("without detail"),
  ]);
  let mut extensions = Extensions::new(Arc::new(source), Arc::new(SubstringMatcher));
  extensions.previewers = vec![Arc::new(DetailPreviewer)];
  let mut picker = picker(extensions);
  picker.open().unwrap();
  settle(&mut picker).await;

  let preview = picker.view().preview.expect("first item has a preview");
  assert_eq!(preview.filename.as_deref(), Some("src/lib.rs"));
  assert_eq!(preview.line, Some(3));

  picker.sender().dispatch(Event::MoveCursor {
    amount: 1,
    cycle:  false,
  });
  settle(&mut picker).await;
  assert_eq!(picker.view().preview, None);
}

#[tokio::test(flavor = "current_thread")]
async fn failed_match_keeps_the_previous_result() {
  let sorter = Arc::new(CountingSorter::default());
  let mut extensions = Extensions::new(Arc::new(numbered(4)), Arc::new(SubstringMatcher));
  extensions.matchers.push(Arc::new(FailingMatcher));
  extensions.sorters = vec![sorter.clone() as Arc<dyn Sorter>];
  let mut picker = picker(extensions);
  picker.open().unwrap();
  settle(&mut picker).await;
  let sorted = sorter.calls.load(Ordering::SeqCst);

  picker.sender().dispatch(Event::SwitchMatcher {
    amount: 1,
    cycle:  false,
  });
  settle(&mut picker).await;

  let view = picker.view();
  assert!(view.progress.matching.failed);
  assert_eq!(view.matched, 4);
  assert_eq!(labels(&view.items), [
    "item 00", "item 01", "item 02", "item 03"
  ]);
  // nothing downstream runs on a failed match
  assert_eq!(sorter.calls.load(Ordering::SeqCst), sorted);
}

#[tokio::test(flavor = "current_thread")]
async fn switching_the_matcher_rematches() {
  let first = Arc::new(RecordingMatcher::default());
  let second = Arc::new(RecordingMatcher::default());
  let mut extensions = Extensions::new(Arc::new(numbered(4)), first.clone() as Arc<dyn Matcher>);
  extensions.matchers.push(second.clone() as Arc<dyn Matcher>);
  let mut picker = picker(extensions).with_query("item");
  picker.open().unwrap();
  settle(&mut picker).await;
  assert!(second.queries().is_empty());
  let first_runs = first.queries().len();

  picker.sender().dispatch(Event::SwitchMatcherAt { index: 1 });
  let dirty = picker.tick().unwrap();
  assert!(dirty.contains(Dirty::STATUS));
  settle(&mut picker).await;
  assert_eq!(second.queries(), ["item"]);
  assert_eq!(picker.view().matched, 4);

  picker.sender().dispatch(Event::SwitchMatcher {
    amount: -1,
    cycle:  false,
  });
  settle(&mut picker).await;
  assert_eq!(first.queries().len(), first_runs + 1);
  assert_eq!(second.queries().len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn switching_the_renderer_rerenders() {
  let mut extensions = Extensions::new(Arc::new(numbered(2)), Arc::new(SubstringMatcher));
  extensions.renderers = vec![
    Arc::new(LabelRenderer) as Arc<dyn Renderer>,
    Arc::new(UppercaseRenderer) as Arc<dyn Renderer>,
  ];
  let mut picker = picker(extensions);
  picker.open().unwrap();
  settle(&mut picker).await;
  assert_eq!(labels(&picker.view().items), ["item 00", "item 01"]);

  picker.sender().dispatch(Event::SwitchRenderer {
    amount: 1,
    cycle:  false,
  });
  settle(&mut picker).await;
  assert_eq!(labels(&picker.view().items), ["ITEM 00", "ITEM 01"]);

  picker.sender().dispatch(Event::SwitchRendererAt { index: 0 });
  settle(&mut picker).await;
  assert_eq!(labels(&picker.view().items), ["item 00", "item 01"]);
}

#[tokio::test(flavor = "current_thread")]
async fn switching_the_previewer_repreviews_the_same_item() {
  let first = Arc::new(CountingPreviewer::default());
  let second = Arc::new(CountingPreviewer::default());
  let mut extensions = Extensions::new(Arc::new(numbered(3)), Arc::new(SubstringMatcher));
  extensions.previewers = vec![
    first.clone() as Arc<dyn Previewer>,
    second.clone() as Arc<dyn Previewer>,
  ];
  let mut picker = picker(extensions);
  picker.open().unwrap();
  settle(&mut picker).await;
  assert_eq!(first.calls.load(Ordering::SeqCst), 1);

  // the cursor stays on the same item, so no new preview
  picker.sender().dispatch(Event::MoveCursorAt { cursor: 0 });
  settle(&mut picker).await;
  assert_eq!(first.calls.load(Ordering::SeqCst), 1);

  picker.sender().dispatch(Event::SwitchPreviewer {
    amount: 1,
    cycle:  false,
  });
  settle(&mut picker).await;
  assert_eq!(second.calls.load(Ordering::SeqCst), 1);
  assert_eq!(picker.current_item().map(|item| item.id), Some(0));
  assert_eq!(
    picker.view().preview,
    Some(PreviewItem::from_lines(["item 00"]))
  );

  picker.sender().dispatch(Event::SwitchPreviewerAt { index: 0 });
  settle(&mut picker).await;
  assert_eq!(first.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn failed_preview_clears_the_preview() {
  let mut extensions = Extensions::new(Arc::new(numbered(2)), Arc::new(SubstringMatcher));
  extensions.previewers = vec![
    Arc::new(CountingPreviewer::default()) as Arc<dyn Previewer>,
    Arc::new(FailingPreviewer) as Arc<dyn Previewer>,
  ];
  let mut picker = picker(extensions);
  picker.open().unwrap();
  settle(&mut picker).await;
  assert!(picker.view().preview.is_some());

  picker.sender().dispatch(Event::SwitchPreviewer {
    amount: 1,
    cycle:  false,
  });
  settle(&mut picker).await;

  let view = picker.view();
  assert!(view.progress.preview.failed);
  assert_eq!(view.preview, None);
  assert!(!view.progress.matching.failed);
}

#[tokio::test(flavor = "current_thread")]
async fn truncated_collection_shows_in_the_view() {
  let mut config = config();
  config.collect.threshold = 4;
  let mut picker = Picker::new(
    Extensions::new(Arc::new(numbered(10)), Arc::new(SubstringMatcher)),
    config,
  )
  .unwrap();
  picker.open().unwrap();
  settle(&mut picker).await;

  let view = picker.view();
  assert!(view.truncated);
  assert_eq!(view.collected, 4);
  assert_eq!(view.matched, 4);
  assert!(!view.progress.collect.failed);
}

#[tokio::test(flavor = "current_thread")]
async fn paused_collection_resumes_on_request() {
  let (source, input) = ChannelSource::new();
  let mut picker = picker(Extensions::new(Arc::new(source), Arc::new(SubstringMatcher)));
  picker.open().unwrap();

  for n in 0..3 {
    input.send(format!("line {n}")).unwrap();
  }
  tick_until(&mut picker, |picker| picker.view().collected == 3).await;

  picker.sender().dispatch(Event::CollectPause);
  picker.tick().unwrap();
  for n in 3..6 {
    input.send(format!("line {n}")).unwrap();
  }
  tokio::time::sleep(Duration::from_millis(20)).await;
  picker.tick().unwrap();
  assert_eq!(picker.view().collected, 3);

  picker.sender().dispatch(Event::CollectResume);
  tick_until(&mut picker, |picker| picker.view().collected == 6).await;

  drop(input);
  settle(&mut picker).await;
  assert_eq!(picker.view().matched, 6);
}

#[tokio::test(flavor = "current_thread")]
async fn disposed_picker_stays_silent() {
  let gate = Arc::new(Notify::new());
  let matcher = Arc::new(RecordingMatcher::gated(Arc::clone(&gate)));
  let mut picker = picker(Extensions::new(
    Arc::new(numbered(5)),
    matcher as Arc<dyn Matcher>,
  ));
  picker.open().unwrap();
  tick_until(&mut picker, |picker| picker.progress().matching.running).await;

  picker.dispose();
  gate.notify_one();
  tokio::time::sleep(Duration::from_millis(20)).await;

  assert!(picker.is_idle());
  assert_eq!(picker.tick(), Err(PickerError::Disposed));
  assert_eq!(picker.open(), Err(PickerError::Disposed));
}

#[test]
fn picker_needs_a_matcher() {
  let mut extensions = Extensions::new(Arc::new(numbered(1)), Arc::new(SubstringMatcher));
  extensions.matchers.clear();
  assert!(matches!(
    Picker::new(extensions, config()),
    Err(PickerError::Processor(_))
  ));
}
