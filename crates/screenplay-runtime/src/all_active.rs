//! All-active policy: every owned item is active whenever the conductor is.
//!
//! The backing collection is observable: the conductor reacts to recorded
//! structural changes. Implicit removals (and the removal half of a
//! replacement) close items immediately *without* consulting their guards —
//! only an explicit `close_item` asks for permission. That asymmetry is
//! deliberate and load-bearing; do not "fix" it.

use async_trait::async_trait;
use futures::future::BoxFuture;
use screenplay_core::{Conductable, ItemId, ListChange, ObservableList, Result};

use crate::base::{
    can_all_items_close, can_close_item, close_and_clean_up, set_parent_and_set_active,
    try_activate, try_deactivate, ConductorBase,
};
use crate::conductor::{ActivationPolicy, Conductor};

/// Policy storage: the observable collection.
pub struct AllActive<T> {
    items: ObservableList<T>,
}

impl<T> Default for AllActive<T> {
    fn default() -> Self {
        Self {
            items: ObservableList::new(),
        }
    }
}

impl<T: Conductable> AllActive<T> {
    /// Apply `mutate` to the collection and react to the recorded changes.
    /// The net effect of a batched edit is the before/after set-difference:
    /// newcomers are parented and aligned with the conductor's state, items
    /// no longer present are closed and cleaned up, guards unconsulted.
    fn react(
        &mut self,
        base: &mut ConductorBase,
        mutate: impl FnOnce(&mut ObservableList<T>),
    ) -> Result<()> {
        let before: Vec<ItemId> = self.items.iter().map(Conductable::id).collect();
        mutate(&mut self.items);
        let changes: Vec<ListChange<T>> = self.items.drain_changes().collect();

        let conductor_active = base.is_active();
        let newcomers = self
            .items
            .iter_mut()
            .filter(|item| !before.contains(&item.id()));
        set_parent_and_set_active(base, newcomers, conductor_active);

        for change in changes {
            match change {
                ListChange::Removed { item, .. } | ListChange::Replaced { old: item, .. } => {
                    close_and_clean_up(base, item)?;
                }
                ListChange::Inserted { .. } => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Conductable> ActivationPolicy<T> for AllActive<T> {
    async fn activate_new(&mut self, base: &mut ConductorBase, item: T) -> Result<Option<T>> {
        self.react(base, |items| items.push(item))?;
        Ok(None)
    }

    async fn activate_existing(&mut self, base: &mut ConductorBase, id: ItemId) -> Result<()> {
        let conductor_active = base.is_active();
        if let Some(index) = self.items.position(|i| i.id() == id) {
            if let Some(item) = self.items.get_mut(index) {
                if conductor_active {
                    try_activate(item);
                } else {
                    try_deactivate(item);
                }
            }
        }
        Ok(())
    }

    fn deactivate_item(&mut self, _base: &mut ConductorBase, id: ItemId) {
        if let Some(index) = self.items.position(|i| i.id() == id) {
            if let Some(item) = self.items.get_mut(index) {
                try_deactivate(item);
            }
        }
    }

    async fn close_item(&mut self, base: &mut ConductorBase, id: ItemId) -> Result<bool> {
        let Some(index) = self.items.position(|i| i.id() == id) else {
            return Ok(false);
        };
        if !can_close_item(self.items.get(index)).await {
            return Ok(false);
        }
        self.react(base, |items| items.remove(index))?;
        Ok(true)
    }

    fn children(&self) -> Vec<&T> {
        self.items.iter().collect()
    }

    fn can_close(&self) -> BoxFuture<'static, bool> {
        can_all_items_close(self.items.iter())
    }

    fn on_activated(&mut self, _base: &mut ConductorBase) {
        for item in self.items.iter_mut() {
            try_activate(item);
        }
    }

    fn on_deactivated(&mut self, _base: &mut ConductorBase) {
        for item in self.items.iter_mut() {
            try_deactivate(item);
        }
    }

    fn on_closed(&mut self, base: &mut ConductorBase) -> Result<()> {
        self.items.clear();
        let removed: Vec<ListChange<T>> = self.items.drain_changes().collect();
        for change in removed {
            if let ListChange::Removed { item, .. } = change {
                close_and_clean_up(base, item)?;
            }
        }
        Ok(())
    }
}

impl<T: Conductable> Conductor<T, AllActive<T>> {
    pub fn items(&self) -> &[T] {
        self.policy_ref().items.as_slice()
    }

    /// Add an item without activating it beyond the conductor's own state.
    pub fn add_item(&mut self, item: T) -> Result<()> {
        let (base, policy) = self.parts_mut();
        policy.react(base, |items| items.push(item))
    }

    pub fn insert_item(&mut self, index: usize, item: T) -> Result<()> {
        let (base, policy) = self.parts_mut();
        policy.react(base, |items| items.insert(index, item))
    }

    /// Implicit removal: the item is closed and cleaned up immediately, its
    /// guard unconsulted.
    pub fn remove_item(&mut self, id: ItemId) -> Result<()> {
        let (base, policy) = self.parts_mut();
        let Some(index) = policy.items.position(|i| i.id() == id) else {
            return Ok(());
        };
        policy.react(base, |items| items.remove(index))
    }

    /// Replace the item at `index`: the newcomer is added, the old item is
    /// removed, same rules as individual add and remove.
    pub fn replace_item(&mut self, index: usize, item: T) -> Result<()> {
        let (base, policy) = self.parts_mut();
        policy.react(base, |items| items.replace(index, item))
    }

    /// Batched edit of the collection; the reaction is computed from the
    /// set-difference between the membership before and after.
    pub fn edit_items(&mut self, edit: impl FnOnce(&mut ObservableList<T>)) -> Result<()> {
        let (base, policy) = self.parts_mut();
        policy.react(base, edit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenplay_core::testing::{GuardBehavior, ProbeEvent, ProbeItem, ProbeLog};
    use screenplay_core::{Lifecycle, ScreenState};

    fn active_conductor() -> Conductor<ProbeItem, AllActive<ProbeItem>> {
        let mut conductor = Conductor::new("workspace");
        conductor.activate();
        conductor
    }

    #[tokio::test]
    async fn items_added_while_active_are_activated() {
        let log = ProbeLog::new();
        let mut conductor = active_conductor();

        conductor.add_item(ProbeItem::new("a", &log)).unwrap();
        conductor
            .activate_item(ProbeItem::new("b", &log))
            .await
            .unwrap();

        assert_eq!(conductor.items().len(), 2);
        assert!(conductor
            .items()
            .iter()
            .all(|i| i.state() == ScreenState::Active));
    }

    #[tokio::test]
    async fn items_added_while_inactive_are_deactivated() {
        let log = ProbeLog::new();
        let mut conductor: Conductor<ProbeItem, AllActive<ProbeItem>> = Conductor::new("workspace");

        conductor.add_item(ProbeItem::new("a", &log)).unwrap();
        assert_eq!(conductor.items()[0].state(), ScreenState::Deactivated);

        // activating the conductor catches the item up
        conductor.activate();
        assert_eq!(conductor.items()[0].state(), ScreenState::Active);
    }

    #[tokio::test]
    async fn implicit_removal_closes_without_consulting_guards() {
        let log = ProbeLog::new();
        let mut conductor = active_conductor();

        let item = ProbeItem::new("a", &log).with_guard(GuardBehavior::Refuse);
        let id = item.id();
        conductor.add_item(item).unwrap();

        conductor.remove_item(id).unwrap();

        assert!(conductor.items().is_empty());
        assert_eq!(log.count(|e| matches!(e, ProbeEvent::GuardPolled { .. })), 0);
        assert_eq!(
            log.count(|e| matches!(e, ProbeEvent::Closed { item } if *item == id)),
            1
        );
    }

    #[tokio::test]
    async fn explicit_close_consults_the_guard() {
        let log = ProbeLog::new();
        let mut conductor = active_conductor();

        let item = ProbeItem::new("a", &log).with_guard(GuardBehavior::Refuse);
        let id = item.id();
        conductor.add_item(item).unwrap();

        assert!(!conductor.close_item(id).await.unwrap());
        assert_eq!(conductor.items().len(), 1);
        assert_eq!(conductor.items()[0].state(), ScreenState::Active);

        let allowed = ProbeItem::new("b", &log).with_guard(GuardBehavior::Allow);
        let allowed_id = allowed.id();
        conductor.add_item(allowed).unwrap();
        assert!(conductor.close_item(allowed_id).await.unwrap());
        assert_eq!(conductor.items().len(), 1);
    }

    #[tokio::test]
    async fn replace_adds_new_and_closes_old() {
        let log = ProbeLog::new();
        let mut conductor = active_conductor();

        let old = ProbeItem::new("old", &log);
        let old_id = old.id();
        conductor.add_item(old).unwrap();

        let new = ProbeItem::new("new", &log);
        let new_id = new.id();
        conductor.replace_item(0, new).unwrap();

        assert_eq!(conductor.items().len(), 1);
        assert_eq!(conductor.items()[0].id(), new_id);
        assert_eq!(conductor.items()[0].state(), ScreenState::Active);
        assert_eq!(
            log.count(|e| matches!(e, ProbeEvent::Closed { item } if *item == old_id)),
            1
        );
    }

    #[tokio::test]
    async fn bulk_edit_reacts_to_the_set_difference() {
        let log = ProbeLog::new();
        let mut conductor = active_conductor();

        conductor.add_item(ProbeItem::new("a", &log)).unwrap();
        let b = ProbeItem::new("b", &log);
        let b_id = b.id();
        conductor.add_item(b).unwrap();

        let c = ProbeItem::new("c", &log);
        let c_id = c.id();
        conductor
            .edit_items(|items| {
                items.remove(1);
                items.push(c);
            })
            .unwrap();

        assert_eq!(conductor.items().len(), 2);
        assert_eq!(
            log.count(|e| matches!(e, ProbeEvent::Closed { item } if *item == b_id)),
            1
        );
        assert_eq!(
            log.count(|e| matches!(e, ProbeEvent::Activated { .. })),
            3 // a, b on add; c on edit — b's close does not re-activate anyone
        );
        assert!(conductor.items().iter().any(|i| i.id() == c_id));
    }

    #[tokio::test]
    async fn aggregate_guard_lets_every_check_settle() {
        let log = ProbeLog::new();
        let mut conductor = active_conductor();

        conductor
            .add_item(ProbeItem::new("a", &log).with_guard(GuardBehavior::Refuse))
            .unwrap();
        conductor
            .add_item(ProbeItem::new("b", &log).with_guard(GuardBehavior::Slow(true)))
            .unwrap();
        conductor.add_item(ProbeItem::new("c", &log)).unwrap();

        assert!(!conductor.can_close().await);
        assert_eq!(log.count(|e| matches!(e, ProbeEvent::GuardPolled { .. })), 2);
        assert_eq!(
            log.count(|e| matches!(e, ProbeEvent::GuardSettled { .. })),
            2
        );
    }

    #[tokio::test]
    async fn conductor_deactivation_propagates_to_all_items() {
        let log = ProbeLog::new();
        let mut conductor = active_conductor();

        conductor.add_item(ProbeItem::new("a", &log)).unwrap();
        conductor.add_item(ProbeItem::new("b", &log)).unwrap();

        conductor.deactivate();
        assert!(conductor
            .items()
            .iter()
            .all(|i| i.state() == ScreenState::Deactivated));
    }

    #[tokio::test]
    async fn conductor_close_cleans_out_the_collection() {
        let log = ProbeLog::new();
        let mut conductor = active_conductor();

        conductor
            .add_item(ProbeItem::new("a", &log).with_disposal())
            .unwrap();
        conductor.add_item(ProbeItem::new("b", &log)).unwrap();

        conductor.close().unwrap();

        assert!(conductor.items().is_empty());
        assert_eq!(log.count(|e| matches!(e, ProbeEvent::Closed { .. })), 2);
        assert_eq!(log.count(|e| matches!(e, ProbeEvent::Disposed { .. })), 1);
    }

    #[tokio::test]
    async fn disposal_failure_propagates_from_conductor_close() {
        let log = ProbeLog::new();
        let mut conductor = active_conductor();

        conductor
            .add_item(ProbeItem::new("a", &log).with_failing_disposal())
            .unwrap();

        assert!(conductor.close().is_err());
    }
}
