//! Conductor
//!
//! One generic conductor type; what varies between the single-item,
//! all-active, one-active, and stack-navigation flavours is the
//! [`ActivationPolicy`] strategy it is parametrized with, not a type
//! hierarchy. The policy owns the policy-specific bookkeeping (collection,
//! active slot, history) and receives the shared [`ConductorBase`] alongside
//! it — the two are disjoint fields of [`Conductor`], which is what lets a
//! policy drive shared bookkeeping while mutating its own.
//!
//! A conductor is itself a screen: it satisfies the same capability
//! contracts as the items it owns, so conductors nest to arbitrary depth.

use core::marker::PhantomData;

use async_trait::async_trait;
use futures::future::BoxFuture;
use screenplay_core::{
    Child, CloseGuard, Conductable, ItemId, Lifecycle, ParentHandle, Result, Screen, ScreenState,
    Subscription,
};
use tracing::debug;

use crate::base::{ActiveItemChanged, ConductorBase, ConductorOptions};

// ----------------------------------------------------------------------------
// Activation Policy
// ----------------------------------------------------------------------------

/// Strategy implemented by each activation policy.
#[async_trait]
pub trait ActivationPolicy<T: Conductable>: Send {
    /// Take ownership of `item` and activate it per policy. Returns the item
    /// when a guard refused the transition, leaving all state untouched.
    async fn activate_new(&mut self, base: &mut ConductorBase, item: T) -> Result<Option<T>>;

    /// Drive an already-owned item per policy. Unknown ids are no-ops.
    async fn activate_existing(&mut self, base: &mut ConductorBase, id: ItemId) -> Result<()>;

    /// Deactivate an owned item per policy.
    fn deactivate_item(&mut self, base: &mut ConductorBase, id: ItemId);

    /// Guard-check and, on success, close an owned item per policy. Returns
    /// whether the close committed.
    async fn close_item(&mut self, base: &mut ConductorBase, id: ItemId) -> Result<bool>;

    /// Snapshot of the owned items.
    fn children(&self) -> Vec<&T>;

    /// Aggregated guard over everything the policy owns.
    fn can_close(&self) -> BoxFuture<'static, bool>;

    /// The conductor itself became active.
    fn on_activated(&mut self, base: &mut ConductorBase);

    /// The conductor itself was deactivated.
    fn on_deactivated(&mut self, base: &mut ConductorBase);

    /// The conductor itself closed: tear down every owned item.
    fn on_closed(&mut self, base: &mut ConductorBase) -> Result<()>;
}

// ----------------------------------------------------------------------------
// Conductor
// ----------------------------------------------------------------------------

/// A lifecycle conductor: owns items of type `T` and orchestrates their
/// activation, deactivation, and closing under policy `P`.
pub struct Conductor<T: Conductable, P: ActivationPolicy<T>> {
    base: ConductorBase,
    policy: P,
    _items: PhantomData<fn() -> T>,
}

impl<T: Conductable, P: ActivationPolicy<T> + Default> Conductor<T, P> {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self::with_options(display_name, ConductorOptions::default())
    }

    pub fn with_options(display_name: impl Into<String>, options: ConductorOptions) -> Self {
        Self {
            base: ConductorBase::new(display_name.into(), options),
            policy: P::default(),
            _items: PhantomData,
        }
    }
}

impl<T: Conductable, P: ActivationPolicy<T>> Conductor<T, P> {
    pub fn id(&self) -> ItemId {
        self.base.id()
    }

    /// The conductor's own screen state machine.
    pub fn screen(&self) -> &Screen {
        self.base.screen()
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        self.base.screen_mut()
    }

    pub fn options(&self) -> &ConductorOptions {
        self.base.options()
    }

    pub fn set_dispose_children(&mut self, dispose: bool) {
        self.base.set_dispose_children(dispose);
    }

    /// Observe active-item changes.
    pub fn subscribe_active_changed(
        &mut self,
        handler: impl FnMut(&ActiveItemChanged) + Send + 'static,
    ) -> Subscription {
        self.base.subscribe_active_changed(handler)
    }

    pub fn unsubscribe_active_changed(&mut self, sub: Subscription) -> bool {
        self.base.unsubscribe_active_changed(sub)
    }

    /// Take ownership of `item` and activate it per policy.
    ///
    /// Returns `Ok(Some(item))` — the item handed back, all state untouched —
    /// when a guard refused the transition.
    pub async fn activate_item(&mut self, item: T) -> Result<Option<T>> {
        debug!("conductor {}: activating item {}", self.base.id(), item.id());
        self.policy.activate_new(&mut self.base, item).await
    }

    /// Drive an already-owned item per policy: re-activating the current
    /// active item refreshes it, activating another owned item swaps to it.
    /// Unknown ids are no-ops.
    pub async fn activate_existing(&mut self, id: ItemId) -> Result<()> {
        self.policy.activate_existing(&mut self.base, id).await
    }

    pub fn deactivate_item(&mut self, id: ItemId) {
        self.policy.deactivate_item(&mut self.base, id);
    }

    /// Guard-check and, on success, close an owned item. Returns whether the
    /// close committed; a guard refusal is `Ok(false)` with all state
    /// exactly as before the call.
    pub async fn close_item(&mut self, id: ItemId) -> Result<bool> {
        self.policy.close_item(&mut self.base, id).await
    }

    /// Snapshot of the owned items.
    pub fn children(&self) -> Vec<&T> {
        self.policy.children()
    }

    /// Aggregated guard over everything this conductor owns. The future is
    /// detached: every child check is issued before it is returned.
    pub fn can_close(&self) -> BoxFuture<'static, bool> {
        self.policy.can_close()
    }

    /// Serve close requests queued by children via `request_close`. The
    /// dialog-style result is ignored here, as conductors own no chrome.
    pub async fn drain_close_requests(&mut self) -> Result<()> {
        while let Some(request) = self.base.try_recv_close_request() {
            let committed = self.close_item(request.item).await?;
            if !committed {
                debug!(
                    "conductor {}: close request for {} was refused",
                    self.base.id(),
                    request.item
                );
            }
        }
        Ok(())
    }

    pub(crate) fn base_ref(&self) -> &ConductorBase {
        &self.base
    }

    pub(crate) fn policy_ref(&self) -> &P {
        &self.policy
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut ConductorBase, &mut P) {
        (&mut self.base, &mut self.policy)
    }
}

// ----------------------------------------------------------------------------
// A Conductor Is Itself a Screen
// ----------------------------------------------------------------------------

impl<T: Conductable, P: ActivationPolicy<T>> Lifecycle for Conductor<T, P> {
    fn state(&self) -> ScreenState {
        self.base.screen().state()
    }

    fn activate(&mut self) {
        if self.base.screen().state() != ScreenState::Deactivated {
            return;
        }
        self.base.screen_mut().activate();
        self.policy.on_activated(&mut self.base);
    }

    fn deactivate(&mut self) {
        if self.base.screen().state() != ScreenState::Active {
            return;
        }
        self.base.screen_mut().deactivate();
        self.policy.on_deactivated(&mut self.base);
    }

    fn close(&mut self) -> Result<()> {
        if self.base.screen().state() == ScreenState::Closed {
            return Ok(());
        }
        // children are deactivated before anything is torn down
        self.deactivate();
        self.base.screen_mut().close()?;
        self.policy.on_closed(&mut self.base)
    }
}

impl<T: Conductable, P: ActivationPolicy<T>> Child for Conductor<T, P> {
    fn parent(&self) -> Option<&ParentHandle> {
        self.base.screen().parent()
    }

    fn set_parent(&mut self, parent: Option<ParentHandle>) {
        self.base.screen_mut().set_parent(parent);
    }
}

impl<T: Conductable, P: ActivationPolicy<T>> CloseGuard for Conductor<T, P> {
    fn can_close(&self) -> BoxFuture<'static, bool> {
        self.policy.can_close()
    }
}

impl<T: Conductable, P: ActivationPolicy<T> + 'static> Conductable for Conductor<T, P> {
    fn id(&self) -> ItemId {
        self.base.id()
    }

    fn display_name(&self) -> Option<&str> {
        Some(self.base.screen().display_name())
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

    fn guard(&self) -> Option<&dyn CloseGuard> {
        Some(self)
    }
}
