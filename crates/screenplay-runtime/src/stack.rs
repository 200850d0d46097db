//! Stack-navigation policy: one active item plus a history of previously
//! active items.
//!
//! Forward navigation is unconditional — no guard is consulted — and pushes
//! the outgoing item onto history rather than closing it. Going back is a
//! guarded close of the active item, which pops the most recent history
//! entry back into place. History is an ordered list, not a strict stack:
//! entries can be closed out of the middle of it.

use async_trait::async_trait;
use futures::future::BoxFuture;
use screenplay_core::{Conductable, ItemId, Result};
use tracing::debug;

use crate::base::{
    can_all_items_close, can_close_item, close_and_clean_up, ensure_parent, try_activate,
    try_deactivate, ConductorBase,
};
use crate::conductor::{ActivationPolicy, Conductor};

/// Policy storage. The active item is never also a history member.
pub struct StackNavigation<T> {
    active: Option<T>,
    // arbitrary entries get removed, so a plain Vec rather than a stack type
    history: Vec<T>,
}

impl<T> Default for StackNavigation<T> {
    fn default() -> Self {
        Self {
            active: None,
            history: Vec::new(),
        }
    }
}

impl<T: Conductable> StackNavigation<T> {
    fn active_id(&self) -> Option<ItemId> {
        self.active.as_ref().map(Conductable::id)
    }

    fn history_index(&self, id: ItemId) -> Option<usize> {
        self.history.iter().position(|item| item.id() == id)
    }

    /// Retire the current active item into history, deactivated.
    fn push_active_to_history(&mut self) -> Option<ItemId> {
        let mut previous = self.active.take()?;
        let id = previous.id();
        try_deactivate(&mut previous);
        self.history.push(previous);
        Some(id)
    }

    /// Install `new_item` (or nothing) as the active item. The previous
    /// active item must already have been retired by the caller.
    fn swap_to(
        &mut self,
        base: &mut ConductorBase,
        previous: Option<ItemId>,
        new_item: Option<T>,
    ) {
        let new_id = new_item.as_ref().map(Conductable::id);
        self.active = match new_item {
            Some(mut item) => {
                ensure_parent(base, &mut item);
                Some(item)
            }
            None => None,
        };
        base.notify_active_changed(previous, new_id);
        if let Some(item) = self.active.as_mut() {
            if base.is_active() {
                try_activate(item);
            } else {
                try_deactivate(item);
            }
        }
    }
}

#[async_trait]
impl<T: Conductable> ActivationPolicy<T> for StackNavigation<T> {
    async fn activate_new(&mut self, base: &mut ConductorBase, item: T) -> Result<Option<T>> {
        // forward navigation never consults a guard
        let previous = self.push_active_to_history();
        self.swap_to(base, previous, Some(item));
        Ok(None)
    }

    async fn activate_existing(&mut self, base: &mut ConductorBase, id: ItemId) -> Result<()> {
        if self.active_id() == Some(id) {
            if base.is_active() {
                if let Some(item) = self.active.as_mut() {
                    try_activate(item);
                }
            }
            return Ok(());
        }
        // bringing a history entry forward removes it from history first —
        // the active item is never also a history member
        if let Some(index) = self.history_index(id) {
            let item = self.history.remove(index);
            let previous = self.push_active_to_history();
            self.swap_to(base, previous, Some(item));
        }
        Ok(())
    }

    fn deactivate_item(&mut self, _base: &mut ConductorBase, id: ItemId) {
        if self.active_id() == Some(id) {
            if let Some(item) = self.active.as_mut() {
                try_deactivate(item);
            }
        } else if let Some(index) = self.history_index(id) {
            try_deactivate(&mut self.history[index]);
        }
    }

    async fn close_item(&mut self, base: &mut ConductorBase, id: ItemId) -> Result<bool> {
        if self.active_id() == Some(id) {
            if !can_close_item(self.active.as_ref()).await {
                return Ok(false);
            }
            let previous = self.active.take();
            let previous_id = previous.as_ref().map(Conductable::id);
            if let Some(item) = previous {
                close_and_clean_up(base, item)?;
            }
            let next = self.history.pop();
            debug!(
                "conductor {}: active item {} closed, going back to {:?}",
                base.id(),
                id,
                next.as_ref().map(Conductable::id)
            );
            self.swap_to(base, previous_id, next);
            return Ok(true);
        }

        if let Some(index) = self.history_index(id) {
            if !can_close_item(self.history.get(index)).await {
                return Ok(false);
            }
            // the active item is untouched; no swap, no notification
            let item = self.history.remove(index);
            close_and_clean_up(base, item)?;
            return Ok(true);
        }

        Ok(false)
    }

    fn children(&self) -> Vec<&T> {
        self.active.as_ref().into_iter().chain(self.history.iter()).collect()
    }

    fn can_close(&self) -> BoxFuture<'static, bool> {
        can_all_items_close(self.history.iter().chain(self.active.as_ref()))
    }

    fn on_activated(&mut self, _base: &mut ConductorBase) {
        if let Some(item) = self.active.as_mut() {
            try_activate(item);
        }
    }

    fn on_deactivated(&mut self, _base: &mut ConductorBase) {
        if let Some(item) = self.active.as_mut() {
            try_deactivate(item);
        }
    }

    fn on_closed(&mut self, base: &mut ConductorBase) -> Result<()> {
        for item in self.history.drain(..) {
            close_and_clean_up(base, item)?;
        }
        if let Some(item) = self.active.take() {
            close_and_clean_up(base, item)?;
        }
        Ok(())
    }
}

impl<T: Conductable> Conductor<T, StackNavigation<T>> {
    pub fn active_id(&self) -> Option<ItemId> {
        self.policy_ref().active_id()
    }

    pub fn active_item(&self) -> Option<&T> {
        self.policy_ref().active.as_ref()
    }

    /// Previously active items, oldest first.
    pub fn history(&self) -> &[T] {
        &self.policy_ref().history
    }

    /// Close the active item and re-activate the most recent history entry.
    /// Equivalent to `close_item` on the active item.
    pub async fn go_back(&mut self) -> Result<bool> {
        match self.active_id() {
            Some(id) => self.close_item(id).await,
            None => Ok(false),
        }
    }

    /// Unconditionally close and clean up every history entry, leaving the
    /// active item in place. No guards are consulted — this is bulk teardown
    /// of history only.
    pub fn clear_history(&mut self) -> Result<()> {
        let (base, policy) = self.parts_mut();
        for item in policy.history.drain(..) {
            close_and_clean_up(base, item)?;
        }
        Ok(())
    }
}
