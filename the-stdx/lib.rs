//! Small collection helpers shared by the picker crates.

pub mod belt;
pub mod chunker;

pub use belt::{
  ItemBelt,
  step_index,
};
pub use chunker::{
  Chunker,
  ChunkerError,
};
