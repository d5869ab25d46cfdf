use std::sync::Arc;

use thiserror::Error;

use crate::processor::Stage;

/// Error raised by a pluggable extension, shared so events stay cloneable.
pub type ExtensionError = Arc<anyhow::Error>;

/// Caller-discipline errors of a processor.
///
/// These never come from extensions; they mean the processor was driven
/// incorrectly and are returned straight to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProcessorError {
  #[error("{0} processor is disposed")]
  Disposed(Stage),
  #[error("{0} processor needs at least one extension")]
  NoExtension(Stage),
  #[error("invalid {stage} processor option: {message}")]
  InvalidArgument { stage: Stage, message: String },
  #[error(transparent)]
  Chunker(#[from] the_stdx::ChunkerError),
}

pub type Result<T> = std::result::Result<T, ProcessorError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PickerError {
  #[error("picker is disposed")]
  Disposed,
  #[error(transparent)]
  Processor(#[from] ProcessorError),
}
