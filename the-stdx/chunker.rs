//! Fixed-capacity batching buffer.
//!
//! A [`Chunker`] collects items one by one and reports when it has become
//! full. The caller is expected to [`Chunker::consume`] the batch right
//! after [`Chunker::put`] returns `true`; putting into a full chunker is a
//! caller bug and is reported as [`ChunkerError::BufferFull`].

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChunkerError {
  #[error("chunker capacity must be positive, got {0}")]
  InvalidArgument(usize),
  #[error("chunker is full ({capacity} items); consume it before putting more")]
  BufferFull { capacity: usize },
}

pub type Result<T> = std::result::Result<T, ChunkerError>;

#[derive(Debug)]
pub struct Chunker<T> {
  capacity: usize,
  buffer:   Vec<T>,
}

impl<T> Chunker<T> {
  pub fn new(capacity: usize) -> Result<Self> {
    if capacity == 0 {
      return Err(ChunkerError::InvalidArgument(capacity));
    }
    Ok(Self {
      capacity,
      buffer: Vec::with_capacity(capacity),
    })
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Number of buffered items.
  pub fn count(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn is_full(&self) -> bool {
    self.buffer.len() == self.capacity
  }

  /// Buffer `item`, returning `true` when the chunker has just become full.
  pub fn put(&mut self, item: T) -> Result<bool> {
    if self.is_full() {
      return Err(ChunkerError::BufferFull {
        capacity: self.capacity,
      });
    }
    self.buffer.push(item);
    Ok(self.is_full())
  }

  /// Take every buffered item and reset the count to zero.
  ///
  /// A full buffer is handed over as is and a fresh one is allocated in its
  /// place. A partial buffer is drained into an exactly sized vector so the
  /// backing storage stays with the chunker.
  pub fn consume(&mut self) -> Vec<T> {
    if self.is_full() {
      return std::mem::replace(&mut self.buffer, Vec::with_capacity(self.capacity));
    }
    let mut out = Vec::with_capacity(self.buffer.len());
    out.extend(self.buffer.drain(..));
    out
  }
}
