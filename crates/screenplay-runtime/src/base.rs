//! Shared conductor state and primitives.
//!
//! Every conductor parametrization is built around a [`ConductorBase`]: the
//! conductor's own screen state machine, its options, the active-item
//! observers, and the close-request channel it hands to children. The free
//! functions here are the shared primitives all activation policies lean on.

use futures::future::{join_all, ready, BoxFuture};
use screenplay_core::{
    close_request_channel, CloseRequest, Conductable, EventHandlers, ItemId, Lifecycle,
    ParentHandle, Result, Screen, Subscription,
};
use tokio::sync::mpsc;
use tracing::trace;

// ----------------------------------------------------------------------------
// Options
// ----------------------------------------------------------------------------

/// Tuning knobs shared by every conductor variant.
#[derive(Debug, Clone)]
pub struct ConductorOptions {
    /// Dispose children carrying the disposal capability as part of closing
    /// and cleaning them up.
    pub dispose_children: bool,
}

impl Default for ConductorOptions {
    fn default() -> Self {
        Self {
            dispose_children: true,
        }
    }
}

// ----------------------------------------------------------------------------
// Conductor Base
// ----------------------------------------------------------------------------

/// Notification fired when a conductor's active item changes. Fired exactly
/// once per committed swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveItemChanged {
    pub previous: Option<ItemId>,
    pub current: Option<ItemId>,
}

/// State shared by every conductor parametrization.
pub struct ConductorBase {
    screen: Screen,
    options: ConductorOptions,
    active_changed: EventHandlers<ActiveItemChanged>,
    child_handle: ParentHandle,
    close_requests: mpsc::UnboundedReceiver<CloseRequest>,
}

impl ConductorBase {
    pub(crate) fn new(display_name: String, options: ConductorOptions) -> Self {
        let screen = Screen::new(display_name);
        let (child_handle, close_requests) = close_request_channel(screen.id());
        Self {
            screen,
            options,
            active_changed: EventHandlers::new(),
            child_handle,
            close_requests,
        }
    }

    pub fn id(&self) -> ItemId {
        self.screen.id()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    /// Whether the conductor itself is currently active.
    pub fn is_active(&self) -> bool {
        self.screen.is_active()
    }

    pub fn options(&self) -> &ConductorOptions {
        &self.options
    }

    pub fn set_dispose_children(&mut self, dispose: bool) {
        self.options.dispose_children = dispose;
    }

    /// Observe active-item changes. Handlers run synchronously on the thread
    /// performing the swap.
    pub fn subscribe_active_changed(
        &mut self,
        handler: impl FnMut(&ActiveItemChanged) + Send + 'static,
    ) -> Subscription {
        self.active_changed.subscribe(handler)
    }

    pub fn unsubscribe_active_changed(&mut self, sub: Subscription) -> bool {
        self.active_changed.remove(sub)
    }

    pub(crate) fn notify_active_changed(
        &mut self,
        previous: Option<ItemId>,
        current: Option<ItemId>,
    ) {
        trace!(
            "conductor {}: active item {:?} -> {:?}",
            self.id(),
            previous,
            current
        );
        self.active_changed
            .emit(&ActiveItemChanged { previous, current });
    }

    /// Handle given to children so their close requests route back here.
    pub(crate) fn child_handle(&self) -> ParentHandle {
        self.child_handle.clone()
    }

    pub(crate) fn try_recv_close_request(&mut self) -> Option<CloseRequest> {
        self.close_requests.try_recv().ok()
    }
}

// ----------------------------------------------------------------------------
// Shared Primitives
// ----------------------------------------------------------------------------

/// Activate the item when it carries the state capability; no-op otherwise.
pub fn try_activate<T: Conductable>(item: &mut T) {
    if let Some(lifecycle) = item.lifecycle() {
        lifecycle.activate();
    }
}

/// Deactivate the item when it carries the state capability; no-op otherwise.
pub fn try_deactivate<T: Conductable>(item: &mut T) {
    if let Some(lifecycle) = item.lifecycle() {
        lifecycle.deactivate();
    }
}

/// Idempotently point `item`'s parent back-reference at `base`.
pub fn ensure_parent<T: Conductable>(base: &ConductorBase, item: &mut T) {
    let owner = base.id();
    let handle = base.child_handle();
    if let Some(child) = item.child() {
        if child.parent().map(ParentHandle::owner) != Some(owner) {
            child.set_parent(Some(handle));
        }
    }
}

/// For each item, set the parent, then activate or deactivate it according
/// to `activate`.
pub fn set_parent_and_set_active<'a, T, I>(base: &ConductorBase, items: I, activate: bool)
where
    T: Conductable + 'a,
    I: IntoIterator<Item = &'a mut T>,
{
    for item in items {
        ensure_parent(base, item);
        if activate {
            try_activate(item);
        } else {
            try_deactivate(item);
        }
    }
}

/// Guard check for a single item. Items without the guard capability — and a
/// missing item — are always closable.
pub fn can_close_item<T: Conductable>(item: Option<&T>) -> BoxFuture<'static, bool> {
    match item.and_then(Conductable::guard) {
        Some(guard) => guard.can_close(),
        None => Box::pin(ready(true)),
    }
}

/// Issue a guard check for every item carrying one and AND the results.
///
/// All checks are issued up front and every one of them runs to settlement,
/// even once one has resolved `false` — in-flight checks are never cancelled.
pub fn can_all_items_close<'a, T, I>(items: I) -> BoxFuture<'static, bool>
where
    T: Conductable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let checks: Vec<BoxFuture<'static, bool>> = items
        .into_iter()
        .filter_map(|item| item.guard().map(|guard| guard.can_close()))
        .collect();
    Box::pin(async move { join_all(checks).await.into_iter().all(|allowed| allowed) })
}

/// Deactivate, close, detach, and — per the conductor's options — dispose an
/// item the conductor is done with. Disposal failures propagate to whoever
/// initiated the close.
pub fn close_and_clean_up<T: Conductable>(base: &ConductorBase, mut item: T) -> Result<()> {
    let id = item.id();
    if let Some(lifecycle) = item.lifecycle() {
        lifecycle.deactivate();
        lifecycle.close()?;
    }
    if let Some(child) = item.child() {
        child.set_parent(None);
    }
    if base.options().dispose_children {
        if let Some(disposable) = item.disposable() {
            disposable.dispose()?;
        }
    }
    trace!("conductor {}: item {} closed and cleaned up", base.id(), id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenplay_core::testing::{GuardBehavior, ProbeEvent, ProbeItem, ProbeLog};
    use screenplay_core::{Child, ScreenState};

    fn base() -> ConductorBase {
        ConductorBase::new("test".into(), ConductorOptions::default())
    }

    #[test]
    fn options_default_to_disposing_children() {
        assert!(ConductorOptions::default().dispose_children);
    }

    #[test]
    fn ensure_parent_is_idempotent() {
        let base = base();
        let log = ProbeLog::new();
        let mut item = ProbeItem::new("a", &log);

        ensure_parent(&base, &mut item);
        let owner = item.screen().parent().map(ParentHandle::owner);
        assert_eq!(owner, Some(base.id()));

        ensure_parent(&base, &mut item);
        assert_eq!(item.screen().parent().map(ParentHandle::owner), owner);
    }

    #[tokio::test]
    async fn missing_guards_are_always_closable() {
        let log = ProbeLog::new();
        let items = vec![ProbeItem::new("a", &log), ProbeItem::new("b", &log)];
        assert!(can_all_items_close(items.iter()).await);
        assert_eq!(log.count(|e| matches!(e, ProbeEvent::GuardPolled { .. })), 0);
    }

    #[tokio::test]
    async fn one_refusal_fails_the_aggregate_but_every_check_settles() {
        let log = ProbeLog::new();
        let items = vec![
            ProbeItem::new("a", &log).with_guard(GuardBehavior::Refuse),
            ProbeItem::new("b", &log).with_guard(GuardBehavior::Slow(true)),
            ProbeItem::new("c", &log).with_guard(GuardBehavior::Allow),
        ];

        assert!(!can_all_items_close(items.iter()).await);

        // the slow check was not cancelled by the early refusal
        assert_eq!(log.count(|e| matches!(e, ProbeEvent::GuardPolled { .. })), 3);
        assert_eq!(log.count(|e| matches!(e, ProbeEvent::GuardSettled { .. })), 3);
    }

    #[test]
    fn close_and_clean_up_detaches_and_disposes() {
        let base = base();
        let log = ProbeLog::new();
        let mut item = ProbeItem::new("a", &log).with_disposal();
        ensure_parent(&base, &mut item);
        try_activate(&mut item);

        let id = item.id();
        close_and_clean_up(&base, item).unwrap();

        let events = log.events();
        assert!(events.contains(&ProbeEvent::Deactivated { item: id }));
        assert!(events.contains(&ProbeEvent::Closed { item: id }));
        assert!(events.contains(&ProbeEvent::Disposed { item: id }));
    }

    #[test]
    fn disposal_is_skipped_when_disabled() {
        let mut base = base();
        base.set_dispose_children(false);
        let log = ProbeLog::new();
        let item = ProbeItem::new("a", &log).with_disposal();

        close_and_clean_up(&base, item).unwrap();
        assert_eq!(log.count(|e| matches!(e, ProbeEvent::Disposed { .. })), 0);
    }

    #[test]
    fn disposal_failure_propagates() {
        let base = base();
        let log = ProbeLog::new();
        let item = ProbeItem::new("a", &log).with_failing_disposal();

        assert!(close_and_clean_up(&base, item).is_err());
    }

    #[test]
    fn set_parent_and_set_active_drives_each_item() {
        let base = base();
        let log = ProbeLog::new();
        let mut items = vec![ProbeItem::new("a", &log), ProbeItem::new("b", &log)];

        set_parent_and_set_active(&base, items.iter_mut(), true);
        assert!(items.iter().all(|i| i.state() == ScreenState::Active));

        set_parent_and_set_active(&base, items.iter_mut(), false);
        assert!(items.iter().all(|i| i.state() == ScreenState::Deactivated));
    }
}
