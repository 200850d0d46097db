//! Identity and state types shared across the workspace.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Item Identity
// ----------------------------------------------------------------------------

/// Stable identity of a conducted item.
///
/// Conductors compare items by id, never by address, so an item keeps its
/// identity while it moves between a collection, an active slot, and a
/// navigation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

// ----------------------------------------------------------------------------
// Screen State
// ----------------------------------------------------------------------------

/// State in which a screen can be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenState {
    /// Screen is active; it is the one its conductor currently presents.
    Active,

    /// Screen is deactivated. It is either new, or has been set aside in
    /// favour of another screen.
    #[default]
    Deactivated,

    /// Screen has been closed and detached from its conductor. Terminal.
    Closed,
}

impl ScreenState {
    /// State name for logs and assertions
    pub fn name(&self) -> &'static str {
        match self {
            ScreenState::Active => "Active",
            ScreenState::Deactivated => "Deactivated",
            ScreenState::Closed => "Closed",
        }
    }
}

impl fmt::Display for ScreenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
