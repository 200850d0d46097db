//! Error types for the screenplay workspace.
//!
//! A refused close guard is deliberately *not* represented here: declining a
//! close is an ordinary outcome, reported as `Ok(false)` (or by handing the
//! item back) so that all state stays exactly as it was before the call.

use crate::types::ItemId;

/// Unified error type for screen and conductor operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenplayError {
    /// Disposal of a closing item failed. Raised to whichever caller
    /// initiated the top-level close, including through nested conductors.
    #[error("disposal of item {item} failed: {reason}")]
    Disposal { item: ItemId, reason: String },

    /// A close was requested on a screen that has no parent to route it to.
    #[error("screen {item} has no parent; close request cannot be routed")]
    NoParent { item: ItemId },

    /// The owner named by a parent handle is no longer receiving close
    /// requests.
    #[error("owner of item {item} is no longer receiving close requests")]
    OwnerGone { item: ItemId },
}

pub type Result<T> = core::result::Result<T, ScreenplayError>;
