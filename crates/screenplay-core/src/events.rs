//! Lifecycle event payloads and the multicast subscriber list.

use core::fmt;

use crate::types::ScreenState;

// ----------------------------------------------------------------------------
// Event Payloads
// ----------------------------------------------------------------------------

/// Event raised by a screen's state machine.
///
/// Every payload carries the state being transitioned away from; activation
/// additionally reports whether this is the first activation ever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenEvent {
    /// The state changed, for any reason.
    StateChanged {
        previous: ScreenState,
        new: ScreenState,
    },
    /// The screen became active.
    Activated {
        previous: ScreenState,
        is_initial: bool,
    },
    /// The screen was deactivated.
    Deactivated { previous: ScreenState },
    /// The screen was closed.
    Closed { previous: ScreenState },
}

// ----------------------------------------------------------------------------
// Multicast Handlers
// ----------------------------------------------------------------------------

/// Token returned by [`EventHandlers::subscribe`]; pass it back to
/// [`EventHandlers::remove`] to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

/// Multicast handler list.
///
/// Handlers run synchronously on the thread performing the transition;
/// marshalling onto any particular context is the subscriber's concern.
pub struct EventHandlers<E> {
    next: u64,
    handlers: Vec<(Subscription, Box<dyn FnMut(&E) + Send>)>,
}

impl<E> EventHandlers<E> {
    pub fn new() -> Self {
        Self {
            next: 0,
            handlers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&E) + Send + 'static) -> Subscription {
        let sub = Subscription(self.next);
        self.next += 1;
        self.handlers.push((sub, Box::new(handler)));
        sub
    }

    /// Returns whether a handler was actually removed.
    pub fn remove(&mut self, sub: Subscription) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(s, _)| *s != sub);
        self.handlers.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E> Default for EventHandlers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventHandlers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn emit_reaches_every_subscriber() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut handlers = EventHandlers::new();

        for tag in ["a", "b"] {
            let seen = seen.clone();
            handlers.subscribe(move |value: &u32| {
                seen.lock().unwrap().push((tag, *value));
            });
        }

        handlers.emit(&7);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn removed_subscription_no_longer_fires() {
        let seen = Arc::new(Mutex::new(0u32));
        let mut handlers = EventHandlers::new();

        let seen_inner = seen.clone();
        let sub = handlers.subscribe(move |_: &u32| {
            *seen_inner.lock().unwrap() += 1;
        });

        handlers.emit(&1);
        assert!(handlers.remove(sub));
        assert!(!handlers.remove(sub));
        handlers.emit(&2);

        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
