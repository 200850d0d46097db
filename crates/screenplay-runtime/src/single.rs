//! Single-active-item policy: one item at a time, no backing collection.
//!
//! Activating a new item first asks the incumbent's guard for permission;
//! when granted, the incumbent is closed and discarded as part of the swap.

use async_trait::async_trait;
use futures::future::BoxFuture;
use screenplay_core::{Conductable, ItemId, Result};
use tracing::warn;

use crate::base::{
    can_close_item, close_and_clean_up, ensure_parent, try_activate, try_deactivate, ConductorBase,
};
use crate::conductor::{ActivationPolicy, Conductor};

/// Policy storage: just the active slot.
pub struct Single<T> {
    active: Option<T>,
}

impl<T> Default for Single<T> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<T: Conductable> Single<T> {
    /// The swap protocol with `close_previous = true` — this policy never
    /// retains its previous item.
    fn change_active(&mut self, base: &mut ConductorBase, new_item: Option<T>) -> Result<()> {
        let previous = self.active.take();
        let previous_id = previous.as_ref().map(Conductable::id);
        if let Some(item) = previous {
            close_and_clean_up(base, item)?;
        }

        let new_id = new_item.as_ref().map(Conductable::id);
        if let Some(mut item) = new_item {
            ensure_parent(base, &mut item);
            self.active = Some(item);
        }

        base.notify_active_changed(previous_id, new_id);

        if let Some(item) = self.active.as_mut() {
            if base.is_active() {
                try_activate(item);
            } else {
                try_deactivate(item);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Conductable> ActivationPolicy<T> for Single<T> {
    async fn activate_new(&mut self, base: &mut ConductorBase, item: T) -> Result<Option<T>> {
        if !can_close_item(self.active.as_ref()).await {
            warn!(
                "conductor {}: incumbent refused to close, activation of {} abandoned",
                base.id(),
                item.id()
            );
            return Ok(Some(item));
        }
        self.change_active(base, Some(item))?;
        Ok(None)
    }

    async fn activate_existing(&mut self, base: &mut ConductorBase, id: ItemId) -> Result<()> {
        // idempotent refresh of the current item, only while the conductor
        // itself is active
        if let Some(active) = self.active.as_mut() {
            if active.id() == id && base.is_active() {
                try_activate(active);
            }
        }
        Ok(())
    }

    fn deactivate_item(&mut self, _base: &mut ConductorBase, id: ItemId) {
        if let Some(active) = self.active.as_mut() {
            if active.id() == id {
                try_deactivate(active);
            }
        }
    }

    async fn close_item(&mut self, base: &mut ConductorBase, id: ItemId) -> Result<bool> {
        match self.active.as_ref() {
            Some(active) if active.id() == id => {}
            _ => return Ok(false),
        }
        if !can_close_item(self.active.as_ref()).await {
            return Ok(false);
        }
        self.change_active(base, None)?;
        Ok(true)
    }

    fn children(&self) -> Vec<&T> {
        self.active.as_ref().into_iter().collect()
    }

    fn can_close(&self) -> BoxFuture<'static, bool> {
        can_close_item(self.active.as_ref())
    }

    fn on_activated(&mut self, _base: &mut ConductorBase) {
        if let Some(active) = self.active.as_mut() {
            try_activate(active);
        }
    }

    fn on_deactivated(&mut self, _base: &mut ConductorBase) {
        if let Some(active) = self.active.as_mut() {
            try_deactivate(active);
        }
    }

    fn on_closed(&mut self, base: &mut ConductorBase) -> Result<()> {
        if let Some(item) = self.active.take() {
            close_and_clean_up(base, item)?;
        }
        Ok(())
    }
}

impl<T: Conductable> Conductor<T, Single<T>> {
    pub fn active_id(&self) -> Option<ItemId> {
        self.policy_ref().active.as_ref().map(Conductable::id)
    }

    pub fn active_item(&self) -> Option<&T> {
        self.policy_ref().active.as_ref()
    }
}
