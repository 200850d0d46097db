//! One-active policy: an observable collection of which exactly one member
//! (or none) is active at a time.
//!
//! Added items default to deactivated regardless of the conductor's state;
//! becoming active always takes an explicit activation. When the active item
//! leaves the collection a replacement is chosen by the predecessor policy:
//! prefer the item immediately before the departed one's index, or the new
//! first item when the departed one was first.
//!
//! As with the all-active policy, implicit removals bypass guards; only an
//! explicit `close_item` consults them.

use async_trait::async_trait;
use futures::future::BoxFuture;
use screenplay_core::{Conductable, ItemId, ListChange, ObservableList, Result};
use tracing::debug;

use crate::base::{
    can_all_items_close, can_close_item, close_and_clean_up, ensure_parent,
    set_parent_and_set_active, try_activate, try_deactivate, ConductorBase,
};
use crate::conductor::{ActivationPolicy, Conductor};

/// Policy storage: the observable collection plus the active pointer, which
/// is always a current member when non-null.
pub struct OneActive<T> {
    items: ObservableList<T>,
    active: Option<ItemId>,
}

impl<T> Default for OneActive<T> {
    fn default() -> Self {
        Self {
            items: ObservableList::new(),
            active: None,
        }
    }
}

impl<T: Conductable> OneActive<T> {
    fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.position(|item| item.id() == id)
    }

    fn item_mut(&mut self, id: ItemId) -> Option<&mut T> {
        let index = self.index_of(id)?;
        self.items.get_mut(index)
    }

    /// Apply `mutate` to the collection and react to the recorded changes:
    /// newcomers are parented and left deactivated, departed items are closed
    /// and cleaned up immediately (guards unconsulted), and a departed active
    /// item is replaced via the predecessor policy.
    fn react(
        &mut self,
        base: &mut ConductorBase,
        mutate: impl FnOnce(&mut ObservableList<T>),
    ) -> Result<()> {
        let before: Vec<ItemId> = self.items.iter().map(Conductable::id).collect();
        mutate(&mut self.items);
        let changes: Vec<ListChange<T>> = self.items.drain_changes().collect();

        // newcomers first, so a replacement chosen below is already parented
        let newcomers = self
            .items
            .iter_mut()
            .filter(|item| !before.contains(&item.id()));
        set_parent_and_set_active(base, newcomers, false);

        for change in changes {
            let (index, item) = match change {
                ListChange::Removed { index, item } => (index, item),
                ListChange::Replaced { index, old } => (index, old),
                ListChange::Inserted { .. } => continue,
            };
            let removed_id = item.id();
            close_and_clean_up(base, item)?;
            if self.active == Some(removed_id) {
                let next = self.next_active_after_removal(index);
                debug!(
                    "conductor {}: active item {} removed, replacement {:?}",
                    base.id(),
                    removed_id,
                    next
                );
                self.change_active(base, Some(removed_id), next);
            }
        }
        Ok(())
    }

    /// Predecessor policy against the post-removal collection.
    fn next_active_after_removal(&self, removed_index: usize) -> Option<ItemId> {
        if self.items.is_empty() {
            return None;
        }
        let index = removed_index
            .saturating_sub(1)
            .min(self.items.len() - 1);
        self.items.get(index).map(Conductable::id)
    }

    /// Predecessor policy while `id` is still a member (deactivation path).
    fn next_active_besides(&self, id: ItemId) -> Option<ItemId> {
        if self.items.len() <= 1 {
            return None;
        }
        let index = match self.index_of(id) {
            None => 0,
            Some(0) => 1,
            Some(i) => i - 1,
        };
        self.items.get(index).map(Conductable::id)
    }

    /// The swap protocol for collection-resident items. The outgoing item is
    /// deactivated and retained; close paths take it out of the collection
    /// before swapping, in which case the retire step finds nothing to do.
    fn change_active(
        &mut self,
        base: &mut ConductorBase,
        previous: Option<ItemId>,
        new: Option<ItemId>,
    ) {
        if let Some(prev) = previous.and_then(|id| self.item_mut(id)) {
            try_deactivate(prev);
        }
        if let Some(item) = new.and_then(|id| self.item_mut(id)) {
            ensure_parent(base, item);
        }
        self.active = new;
        base.notify_active_changed(previous, new);
        if let Some(item) = new.and_then(|id| self.item_mut(id)) {
            if base.is_active() {
                try_activate(item);
            } else {
                try_deactivate(item);
            }
        }
    }
}

#[async_trait]
impl<T: Conductable> ActivationPolicy<T> for OneActive<T> {
    async fn activate_new(&mut self, base: &mut ConductorBase, item: T) -> Result<Option<T>> {
        // forward activation carries no guard check
        let id = item.id();
        if self.index_of(id).is_none() {
            self.react(base, |items| items.push(item))?;
        }
        let previous = self.active;
        self.change_active(base, previous, Some(id));
        Ok(None)
    }

    async fn activate_existing(&mut self, base: &mut ConductorBase, id: ItemId) -> Result<()> {
        if self.active == Some(id) {
            if base.is_active() {
                if let Some(item) = self.item_mut(id) {
                    try_activate(item);
                }
            }
            return Ok(());
        }
        if self.index_of(id).is_some() {
            let previous = self.active;
            self.change_active(base, previous, Some(id));
        }
        Ok(())
    }

    fn deactivate_item(&mut self, base: &mut ConductorBase, id: ItemId) {
        if self.active == Some(id) {
            // the item stays in the collection; another member takes over
            let next = self.next_active_besides(id);
            let previous = self.active;
            self.change_active(base, previous, next);
        } else if let Some(item) = self.item_mut(id) {
            try_deactivate(item);
        }
    }

    async fn close_item(&mut self, base: &mut ConductorBase, id: ItemId) -> Result<bool> {
        let Some(index) = self.index_of(id) else {
            return Ok(false);
        };
        if !can_close_item(self.items.get(index)).await {
            debug!("conductor {}: item {} refused to close", base.id(), id);
            return Ok(false);
        }
        // permission granted: removal handling is the same machinery as an
        // implicit removal, predecessor replacement included
        self.react(base, |items| items.remove(index))?;
        Ok(true)
    }

    fn children(&self) -> Vec<&T> {
        self.items.iter().collect()
    }

    fn can_close(&self) -> BoxFuture<'static, bool> {
        // the whole collection votes, not only the active item
        can_all_items_close(self.items.iter())
    }

    fn on_activated(&mut self, _base: &mut ConductorBase) {
        if let Some(id) = self.active {
            if let Some(item) = self.item_mut(id) {
                try_activate(item);
            }
        }
    }

    fn on_deactivated(&mut self, _base: &mut ConductorBase) {
        if let Some(id) = self.active {
            if let Some(item) = self.item_mut(id) {
                try_deactivate(item);
            }
        }
    }

    fn on_closed(&mut self, base: &mut ConductorBase) -> Result<()> {
        self.active = None;
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

impl<T: Conductable> Conductor<T, OneActive<T>> {
    pub fn items(&self) -> &[T] {
        self.policy_ref().items.as_slice()
    }

    pub fn active_id(&self) -> Option<ItemId> {
        self.policy_ref().active
    }

    pub fn active_item(&self) -> Option<&T> {
        let policy = self.policy_ref();
        let id = policy.active?;
        policy.items.iter().find(|item| item.id() == id)
    }

    /// Add an item without activating it; one-active members start
    /// deactivated no matter what the conductor is doing.
    pub fn add_item(&mut self, item: T) -> Result<()> {
        let (base, policy) = self.parts_mut();
        policy.react(base, |items| items.push(item))
    }

    pub fn insert_item(&mut self, index: usize, item: T) -> Result<()> {
        let (base, policy) = self.parts_mut();
        policy.react(base, |items| items.insert(index, item))
    }

    /// Implicit removal: closed and cleaned up immediately, guard
    /// unconsulted; a removed active item is replaced via the predecessor
    /// policy.
    pub fn remove_item(&mut self, id: ItemId) -> Result<()> {
        let (base, policy) = self.parts_mut();
        let Some(index) = policy.index_of(id) else {
            return Ok(());
        };
        policy.react(base, |items| items.remove(index))
    }

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
