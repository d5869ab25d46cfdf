//! Ready-made extensions covering the common pickers.

mod matcher;
mod previewer;
mod renderer;
mod sorter;
mod source;

pub use matcher::{
  FuzzyMatcher,
  MatchMode,
  SubstringMatcher,
};
pub use previewer::DetailPreviewer;
pub use renderer::LabelRenderer;
pub use sorter::{
  LengthSorter,
  LexicalSorter,
};
pub use source::{
  LinesSource,
  ListSource,
};
