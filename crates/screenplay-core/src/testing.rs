//! Instrumented probe items for exercising conductors in tests.
//!
//! A [`ProbeItem`] is a conducted item whose every observable moment —
//! lifecycle transitions, guard polls and settlements, disposal — is written
//! into a shared [`ProbeLog`], so a test can assert on the exact sequence a
//! conductor produced. Only compiled with the `testing` feature.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;

use crate::capability::{Child, CloseGuard, Conductable, Disposable, Lifecycle};
use crate::error::{Result, ScreenplayError};
use crate::events::ScreenEvent;
use crate::screen::Screen;
use crate::types::{ItemId, ScreenState};

// ----------------------------------------------------------------------------
// Probe Log
// ----------------------------------------------------------------------------

/// Everything probes record, in order of occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEvent {
    StateChanged {
        item: ItemId,
        previous: ScreenState,
        new: ScreenState,
    },
    Activated {
        item: ItemId,
        is_initial: bool,
    },
    Deactivated {
        item: ItemId,
    },
    Closed {
        item: ItemId,
    },
    /// A guard check was issued for the item.
    GuardPolled {
        item: ItemId,
    },
    /// A guard check settled with the given verdict.
    GuardSettled {
        item: ItemId,
        verdict: bool,
    },
    Disposed {
        item: ItemId,
    },
}

/// Shared recorder an entire test scenario writes into.
#[derive(Debug, Clone, Default)]
pub struct ProbeLog(Arc<Mutex<Vec<ProbeEvent>>>);

impl ProbeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: ProbeEvent) {
        self.0.lock().unwrap().push(event);
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<ProbeEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&ProbeEvent) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

// ----------------------------------------------------------------------------
// Probe Item
// ----------------------------------------------------------------------------

/// How a probe's close guard behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardBehavior {
    /// No guard capability at all.
    Missing,
    /// Settles `true` immediately.
    Allow,
    /// Settles `false` immediately.
    Refuse,
    /// Settles with the given verdict after a short delay, for exercising
    /// suspension points.
    Slow(bool),
}

/// Fully instrumented conducted item.
pub struct ProbeItem {
    screen: Screen,
    guard: GuardBehavior,
    has_disposal: bool,
    fail_disposal: bool,
    log: ProbeLog,
}

impl ProbeItem {
    pub fn new(name: &str, log: &ProbeLog) -> Self {
        let mut screen = Screen::new(name);
        let id = screen.id();
        let sink = log.clone();
        screen.subscribe(move |event| {
            sink.record(match *event {
                ScreenEvent::StateChanged { previous, new } => ProbeEvent::StateChanged {
                    item: id,
                    previous,
                    new,
                },
                ScreenEvent::Activated { is_initial, .. } => ProbeEvent::Activated {
                    item: id,
                    is_initial,
                },
                ScreenEvent::Deactivated { .. } => ProbeEvent::Deactivated { item: id },
                ScreenEvent::Closed { .. } => ProbeEvent::Closed { item: id },
            });
        });
        Self {
            screen,
            guard: GuardBehavior::Missing,
            has_disposal: false,
            fail_disposal: false,
            log: log.clone(),
        }
    }

    pub fn with_guard(mut self, guard: GuardBehavior) -> Self {
        self.guard = guard;
        self
    }

    /// Give the probe the disposal capability.
    pub fn with_disposal(mut self) -> Self {
        self.has_disposal = true;
        self
    }

    /// Disposal capability that fails, for error-propagation tests.
    pub fn with_failing_disposal(mut self) -> Self {
        self.has_disposal = true;
        self.fail_disposal = true;
        self
    }

    pub fn id(&self) -> ItemId {
        self.screen.id()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn state(&self) -> ScreenState {
        self.screen.state()
    }
}

impl Conductable for ProbeItem {
    fn id(&self) -> ItemId {
        self.screen.id()
    }

    fn display_name(&self) -> Option<&str> {
        Some(self.screen.display_name())
    }

    fn lifecycle(&mut self) -> Option<&mut dyn Lifecycle> {
        Some(&mut self.screen)
    }

    fn lifecycle_ref(&self) -> Option<&dyn Lifecycle> {
        Some(&self.screen)
    }

    fn child(&mut self) -> Option<&mut dyn Child> {
        Some(&mut self.screen)
    }

    fn guard(&self) -> Option<&dyn CloseGuard> {
        match self.guard {
            GuardBehavior::Missing => None,
            _ => Some(self),
        }
    }

    fn disposable(&mut self) -> Option<&mut dyn Disposable> {
        if self.has_disposal {
            Some(self)
        } else {
            None
        }
    }
}

impl CloseGuard for ProbeItem {
    fn can_close(&self) -> BoxFuture<'static, bool> {
        let id = self.id();
        let log = self.log.clone();
        log.record(ProbeEvent::GuardPolled { item: id });
        let behavior = self.guard;
        Box::pin(async move {
            let verdict = match behavior {
                GuardBehavior::Missing | GuardBehavior::Allow => true,
                GuardBehavior::Refuse => false,
                GuardBehavior::Slow(verdict) => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    verdict
                }
            };
            log.record(ProbeEvent::GuardSettled { item: id, verdict });
            verdict
        })
    }
}

impl Disposable for ProbeItem {
    fn dispose(&mut self) -> Result<()> {
        self.log.record(ProbeEvent::Disposed { item: self.id() });
        if self.fail_disposal {
            return Err(ScreenplayError::Disposal {
                item: self.id(),
                reason: "probe configured to fail disposal".into(),
            });
        }
        Ok(())
    }
}
