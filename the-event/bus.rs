use std::{
  fmt,
  sync::Arc,
};

use parking_lot::Mutex;

/// Ordered event queue drained once per tick.
///
/// Producers push through cloned [`EventSender`]s. The owner of the bus is
/// the only consumer: [`EventBus::consume`] takes the whole queue at once and
/// hands the events to the handler in arrival order. Anything dispatched
/// while the handler runs lands in the now empty queue and waits for the next
/// drain, so a handler can never recurse into itself.
pub struct EventBus<E> {
  queue: Arc<Mutex<Vec<E>>>,
}

/// Producer side of an [`EventBus`].
pub struct EventSender<E> {
  queue: Arc<Mutex<Vec<E>>>,
}

impl<E> Clone for EventSender<E> {
  fn clone(&self) -> Self {
    Self {
      queue: Arc::clone(&self.queue),
    }
  }
}

impl<E> fmt::Debug for EventSender<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventSender")
      .field("pending", &self.queue.lock().len())
      .finish()
  }
}

impl<E> Default for EventBus<E> {
  fn default() -> Self {
    Self::new()
  }
}

impl<E> EventBus<E> {
  pub fn new() -> Self {
    Self {
      queue: Arc::new(Mutex::new(Vec::new())),
    }
  }

  pub fn sender(&self) -> EventSender<E> {
    EventSender {
      queue: Arc::clone(&self.queue),
    }
  }

  /// Push an event from the consumer side.
  pub fn dispatch(&self, event: E) {
    self.queue.lock().push(event);
  }

  /// Number of events waiting for the next drain.
  pub fn pending(&self) -> usize {
    self.queue.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.queue.lock().is_empty()
  }

  /// Drain every queued event into `handler`, oldest first.
  ///
  /// The queue lock is released before the handler runs.
  pub fn consume(&self, mut handler: impl FnMut(E)) {
    let events = std::mem::take(&mut *self.queue.lock());
    for event in events {
      handler(event);
    }
  }

  /// Drop everything that has not been delivered yet.
  pub fn clear(&self) {
    let dropped = std::mem::take(&mut *self.queue.lock());
    if !dropped.is_empty() {
      log::debug!("dropped {} undelivered events", dropped.len());
    }
  }
}

impl<E> EventSender<E> {
  pub fn dispatch(&self, event: E) {
    self.queue.lock().push(event);
  }

  /// Push `event` only if `allow` holds, checked under the queue lock.
  ///
  /// A producer whose permission is revoked before [`EventBus::clear`] can
  /// therefore never leave an event behind after the clear. Returns whether
  /// the event was queued.
  pub fn dispatch_if(&self, event: E, allow: impl FnOnce() -> bool) -> bool {
    let mut queue = self.queue.lock();
    if !allow() {
      return false;
    }
    queue.push(event);
    true
  }
}
