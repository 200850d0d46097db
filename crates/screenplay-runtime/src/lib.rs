//! Screenplay Runtime
//!
//! The orchestration engine of the screenplay composition framework: one
//! generic [`Conductor`] driven by interchangeable activation policies —
//! single active item, all items active, one of many active, and stack-based
//! navigation. `screenplay-core` provides the stable API definitions; this
//! crate decides when screens move between states.
//!
//! Conductors are themselves screens, so the four policies compose into
//! ownership trees of arbitrary shape: a one-active shell conducting
//! stack-navigation sections conducting plain screens is the typical
//! arrangement.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod all_active;
pub mod base;
pub mod conductor;
pub mod one_active;
pub mod single;
pub mod stack;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use all_active::AllActive;
pub use base::{
    can_all_items_close, can_close_item, close_and_clean_up, ensure_parent,
    set_parent_and_set_active, try_activate, try_deactivate, ActiveItemChanged, ConductorBase,
    ConductorOptions,
};
pub use conductor::{ActivationPolicy, Conductor};
pub use one_active::OneActive;
pub use single::Single;
pub use stack::StackNavigation;

/// Conductor with a single active item and no other items.
pub type SingleConductor<T> = Conductor<T, Single<T>>;

/// Conductor whose items are all active at the same time.
pub type AllActiveConductor<T> = Conductor<T, AllActive<T>>;

/// Conductor with many items, one of which is active.
pub type OneActiveConductor<T> = Conductor<T, OneActive<T>>;

/// Conductor with one active item and a history of previous ones.
pub type StackConductor<T> = Conductor<T, StackNavigation<T>>;

// Re-export core types for convenience
pub use screenplay_core::{
    close_request_channel, Child, CloseDelegate, CloseGuard, CloseRequest, Conductable,
    Disposable, EventHandlers, ItemId, Lifecycle, ListChange, ObservableList, ParentHandle,
    Result, Screen, ScreenEvent, ScreenState, ScreenplayError, Subscription,
};
