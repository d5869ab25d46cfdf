//! Event plumbing shared by the picker stages.
//!
//! - [`EventBus`]: an ordered queue with many producers and a single drain
//!   point per scheduler tick.
//! - [`TaskController`] / [`TaskHandle`]: cooperative cancellation for the
//!   asynchronous work started by a stage.

mod bus;
mod cancel;

pub use bus::{
  EventBus,
  EventSender,
};
pub use cancel::{
  TaskController,
  TaskHandle,
  cancelable_future,
};
