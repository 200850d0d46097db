//! Close-request routing between screens and their owners.
//!
//! A child never closes itself: it asks its owner to do so, and the owner
//! runs the close through its own guard logic. The back-reference from child
//! to owner is deliberately non-owning — just the owner's id plus the channel
//! its close requests are delivered on.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{Result, ScreenplayError};
use crate::types::ItemId;

// ----------------------------------------------------------------------------
// Close Requests
// ----------------------------------------------------------------------------

/// A request, raised by a screen on itself, that its owner close it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseRequest {
    /// Item asking to be closed
    pub item: ItemId,
    /// Dialog-style result to surface to the host, if any. Conductors ignore
    /// it; a window-shell host may not.
    pub result: Option<bool>,
}

/// Non-owning back-reference from a child to the conductor (or host) that
/// owns it.
///
/// Cloning the handle does not extend the owner's lifetime: when the owner is
/// gone, [`ParentHandle::request_close`] reports [`ScreenplayError::OwnerGone`].
#[derive(Debug, Clone)]
pub struct ParentHandle {
    owner: ItemId,
    requests: mpsc::UnboundedSender<CloseRequest>,
}

impl ParentHandle {
    /// Id of the owning conductor or host.
    pub fn owner(&self) -> ItemId {
        self.owner
    }

    /// Deliver a close request to the owner.
    pub fn request_close(&self, item: ItemId, result: Option<bool>) -> Result<()> {
        self.requests
            .send(CloseRequest { item, result })
            .map_err(|_| ScreenplayError::OwnerGone { item })
    }
}

/// Create the channel pair backing a [`ParentHandle`].
///
/// Conductors do this internally when constructed; a top-level host does it
/// explicitly to adopt a root screen.
pub fn close_request_channel(
    owner: ItemId,
) -> (ParentHandle, mpsc::UnboundedReceiver<CloseRequest>) {
    let (requests, rx) = mpsc::unbounded_channel();
    (ParentHandle { owner, requests }, rx)
}

// ----------------------------------------------------------------------------
// Close Delegate
// ----------------------------------------------------------------------------

/// Contract satisfied by whatever sits at the top of an ownership tree — a
/// window shell, for instance — and drains close requests once the logical
/// close has been decided.
///
/// Conductors provide the equivalent plumbing through their own
/// `close_item` / `drain_close_requests`; this trait exists for hosts that
/// own external chrome this crate knows nothing about.
#[async_trait]
pub trait CloseDelegate {
    /// Close the given item, optionally carrying a dialog-style result.
    /// Returns whether the close committed.
    async fn close_item(&mut self, item: ItemId, result: Option<bool>) -> Result<bool>;
}
