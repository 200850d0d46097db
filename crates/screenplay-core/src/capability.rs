//! Capability contracts conducted items may satisfy.
//!
//! This is a tagged-capability model: each item type declares, through the
//! accessors on [`Conductable`], which optional contracts it satisfies, and a
//! conductor only ever branches on those declared accessors. There is no
//! dynamic type inspection anywhere in the workspace.

use futures::future::BoxFuture;

use crate::error::Result;
use crate::request::ParentHandle;
use crate::types::{ItemId, ScreenState};

// ----------------------------------------------------------------------------
// Individual Capabilities
// ----------------------------------------------------------------------------

/// State capability: the item carries the screen lifecycle state machine and
/// can be driven through it by a conductor.
pub trait Lifecycle {
    /// Current state of the item.
    fn state(&self) -> ScreenState;

    /// Whether the current state is [`ScreenState::Active`].
    fn is_active(&self) -> bool {
        self.state() == ScreenState::Active
    }

    /// Activate the item. May not actually cause activation (no-op when
    /// already active or closed).
    fn activate(&mut self);

    /// Deactivate the item. No-op unless currently active.
    fn deactivate(&mut self);

    /// Close the item, deactivating it first if necessary. No-op when
    /// already closed. Fallible because conductors propagate child teardown
    /// failures out of their own close.
    fn close(&mut self) -> Result<()>;
}

/// Parent-holding capability: a settable, non-owning back-reference to the
/// item's owner, written by the conductor and used only for close-request
/// routing.
pub trait Child {
    fn parent(&self) -> Option<&ParentHandle>;

    fn set_parent(&mut self, parent: Option<ParentHandle>);
}

/// Guard-close capability: an asynchronous veto consulted by a conductor
/// before it commits a close. The item itself never self-closes based on it.
///
/// The returned future is detached from the item: a conductor issues every
/// relevant check first and only then suspends, so no borrow is held while
/// checks settle and no mutation is observable before they do. In-flight
/// checks are never cancelled, even once one of them has resolved `false`.
pub trait CloseGuard {
    fn can_close(&self) -> BoxFuture<'static, bool>;
}

/// Disposal capability, for items owning resources beyond their own memory.
/// Invoked by owners configured to dispose on close.
pub trait Disposable {
    fn dispose(&mut self) -> Result<()>;
}

// ----------------------------------------------------------------------------
// Conducted Item
// ----------------------------------------------------------------------------

/// A unit a conductor can own.
///
/// Identity is stable for the item's whole life. Every capability accessor
/// defaults to "not satisfied"; an item missing the guard capability is
/// treated as always closable, and one missing the state capability simply
/// isn't driven through lifecycle transitions.
pub trait Conductable: Send + 'static {
    /// Stable identity used for every equality decision a conductor makes.
    fn id(&self) -> ItemId;

    /// Human-readable name, when the item carries one.
    fn display_name(&self) -> Option<&str> {
        None
    }

    /// State capability.
    fn lifecycle(&mut self) -> Option<&mut dyn Lifecycle> {
        None
    }

    /// Read-only view of the state capability.
    fn lifecycle_ref(&self) -> Option<&dyn Lifecycle> {
        None
    }

    /// Parent-holding capability.
    fn child(&mut self) -> Option<&mut dyn Child> {
        None
    }

    /// Guard-close capability.
    fn guard(&self) -> Option<&dyn CloseGuard> {
        None
    }

    /// Disposal capability.
    fn disposable(&mut self) -> Option<&mut dyn Disposable> {
        None
    }
}
