//! Asynchronous pipeline behind an interactive fuzzy picker.
//!
//! Candidates flow through five stages: collect, match, sort, render and
//! preview. Each stage runs at most one invocation at a time, can be
//! restarted or canceled, and reports progress as [`Event`]s on a shared bus.
//! The [`Picker`] drains that bus on every tick and decides which stage runs
//! next.

pub mod builtin;
pub mod config;
pub mod error;
pub mod event;
pub mod extension;
pub mod item;
pub mod picker;
pub mod processor;
pub mod scroll;

pub use config::PickerConfig;
pub use error::{
  ExtensionError,
  PickerError,
  ProcessorError,
};
pub use event::{
  Event,
  EventBus,
  EventSender,
  SelectMethod,
};
pub use extension::{
  CollectParams,
  Matcher,
  Previewer,
  Renderer,
  Sorter,
  Source,
};
pub use item::{
  Decoration,
  DisplayItem,
  Item,
  ItemId,
  ItemList,
  PreviewItem,
  SourceItem,
};
pub use picker::{
  Dirty,
  Extensions,
  Picker,
  PickerView,
  Progress,
  StageProgress,
};
pub use processor::Stage;
pub use the_event::TaskHandle;
