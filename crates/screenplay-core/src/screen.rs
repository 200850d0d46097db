//! Screen State Machine
//!
//! A screen is a unit of lifecycle-managed state with no inherent visual
//! representation. It moves between `Active`, `Deactivated` (initial) and
//! `Closed` (terminal), firing `StateChanged` before the transition-specific
//! event on every move. Closing an active screen deactivates it first, with
//! that transition's events.
//!
//! The screen never decides for itself when to transition — that is its
//! conductor's job. The one thing it initiates is a *close request*, routed
//! to its parent rather than applied locally.

use core::fmt;

use tracing::{debug, trace};

use crate::capability::{Child, Conductable, Lifecycle};
use crate::error::{Result, ScreenplayError};
use crate::events::{EventHandlers, ScreenEvent, Subscription};
use crate::request::ParentHandle;
use crate::types::{ItemId, ScreenState};

/// The canonical lifecycle-bearing entity. Item types embed one and delegate
/// their state capability to it; conductors are themselves built around one.
pub struct Screen {
    id: ItemId,
    display_name: String,
    state: ScreenState,
    ever_activated: bool,
    parent: Option<ParentHandle>,
    events: EventHandlers<ScreenEvent>,
}

impl Screen {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            display_name: display_name.into(),
            state: ScreenState::default(),
            ever_activated: false,
            parent: None,
            events: EventHandlers::new(),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }

    /// Subscribe to lifecycle events. Handlers run synchronously on the
    /// thread performing the transition.
    pub fn subscribe(&mut self, handler: impl FnMut(&ScreenEvent) + Send + 'static) -> Subscription {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
        self.events.remove(sub)
    }

    /// Ask the owning conductor to close this screen, optionally carrying a
    /// dialog-style result. Errors when no parent has been set.
    pub fn request_close(&self, result: Option<bool>) -> Result<()> {
        match &self.parent {
            Some(parent) => parent.request_close(self.id, result),
            None => Err(ScreenplayError::NoParent { item: self.id }),
        }
    }

    /// Transition to `new`, firing `StateChanged`. Returns the previous state.
    fn set_state(&mut self, new: ScreenState) -> ScreenState {
        let previous = self.state;
        self.state = new;
        trace!("screen {} state {} -> {}", self.id, previous, new);
        self.events.emit(&ScreenEvent::StateChanged { previous, new });
        previous
    }
}

impl Lifecycle for Screen {
    fn state(&self) -> ScreenState {
        self.state
    }

    fn activate(&mut self) {
        if self.state != ScreenState::Deactivated {
            return;
        }
        let previous = self.set_state(ScreenState::Active);
        let is_initial = !self.ever_activated;
        self.ever_activated = true;
        debug!(
            "screen {} ({:?}) activated, initial: {}",
            self.id, self.display_name, is_initial
        );
        self.events.emit(&ScreenEvent::Activated {
            previous,
            is_initial,
        });
    }

    fn deactivate(&mut self) {
        if self.state != ScreenState::Active {
            return;
        }
        let previous = self.set_state(ScreenState::Deactivated);
        debug!("screen {} ({:?}) deactivated", self.id, self.display_name);
        self.events.emit(&ScreenEvent::Deactivated { previous });
    }

    fn close(&mut self) -> Result<()> {
        if self.state == ScreenState::Closed {
            return Ok(());
        }
        self.deactivate();
        let previous = self.set_state(ScreenState::Closed);
        debug!("screen {} ({:?}) closed", self.id, self.display_name);
        self.events.emit(&ScreenEvent::Closed { previous });
        Ok(())
    }
}

impl Child for Screen {
    fn parent(&self) -> Option<&ParentHandle> {
        self.parent.as_ref()
    }

    fn set_parent(&mut self, parent: Option<ParentHandle>) {
        self.parent = parent;
    }
}

/// A bare screen is itself conductable: it has identity, a name, the state
/// machine, and a parent slot. It carries no guard (always closable) and
/// owns nothing worth disposing.
impl Conductable for Screen {
    fn id(&self) -> ItemId {
        self.id
    }

    fn display_name(&self) -> Option<&str> {
        Some(&self.display_name)
    }

    fn lifecycle(&mut self) -> Option<&mut dyn Lifecycle> {
        Some(self)
    }

    fn lifecycle_ref(&self) -> Option<&dyn Lifecycle> {
        Some(self)
    }

    fn child(&mut self) -> Option<&mut dyn Child> {
        Some(self)
    }
}

impl fmt::Debug for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screen")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("state", &self.state)
            .finish()
    }
}
