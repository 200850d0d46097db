//! Cross-policy integration tests: nesting, close-request routing, and the
//! end-to-end scenarios that span more than one module.

use async_trait::async_trait;
use screenplay_core::testing::{GuardBehavior, ProbeEvent, ProbeItem, ProbeLog};
use screenplay_runtime::{
    can_close_item, close_request_channel, Child, CloseDelegate, CloseRequest, Conductable,
    ItemId, Lifecycle, OneActiveConductor, Result, ScreenState, SingleConductor, StackConductor,
};
use tokio::sync::mpsc;

#[tokio::test]
async fn single_conductor_swap_scenario() {
    // Single-active conductor with active item x, guard resolving true
    // immediately: activating y closes x, parents y, activates y, and fires
    // exactly one active-item notification for the swap.
    let log = ProbeLog::new();
    let mut shell: SingleConductor<ProbeItem> = SingleConductor::new("shell");
    shell.activate();

    let x = ProbeItem::new("x", &log).with_guard(GuardBehavior::Allow);
    let x_id = x.id();
    shell.activate_item(x).await.unwrap();

    let notifications = std::sync::Arc::new(std::sync::Mutex::new(0usize));
    let sink = notifications.clone();
    shell.subscribe_active_changed(move |_| {
        *sink.lock().unwrap() += 1;
    });

    let y = ProbeItem::new("y", &log);
    let y_id = y.id();
    assert!(shell.activate_item(y).await.unwrap().is_none());

    let events = log.events();
    let deactivated = events
        .iter()
        .position(|e| *e == ProbeEvent::Deactivated { item: x_id })
        .expect("x deactivated");
    let closed = events
        .iter()
        .position(|e| *e == ProbeEvent::Closed { item: x_id })
        .expect("x closed");
    let activated = events
        .iter()
        .position(|e| matches!(e, ProbeEvent::Activated { item, .. } if *item == y_id))
        .expect("y activated");
    assert!(deactivated < closed && closed < activated);

    assert_eq!(*notifications.lock().unwrap(), 1);
    assert_eq!(shell.active_id(), Some(y_id));
}

#[tokio::test]
async fn stack_navigation_scenario() {
    // activate a, b, c; go back twice: active is a, history empty, b and c
    // each closed and cleaned exactly once.
    let log = ProbeLog::new();
    let mut nav: StackConductor<ProbeItem> = StackConductor::new("nav");
    nav.activate();

    let mut ids = Vec::new();
    for name in ["a", "b", "c"] {
        let item = ProbeItem::new(name, &log);
        ids.push(item.id());
        nav.activate_item(item).await.unwrap();
    }

    assert!(nav.go_back().await.unwrap());
    assert!(nav.go_back().await.unwrap());

    assert_eq!(nav.active_id(), Some(ids[0]));
    assert!(nav.history().is_empty());
    for id in [ids[1], ids[2]] {
        assert_eq!(
            log.count(|e| matches!(e, ProbeEvent::Closed { item } if *item == id)),
            1
        );
    }
}

#[tokio::test]
async fn close_request_routes_through_the_parent() {
    let log = ProbeLog::new();
    let mut tabs: OneActiveConductor<ProbeItem> = OneActiveConductor::new("tabs");
    tabs.activate();

    let item = ProbeItem::new("document", &log);
    let id = item.id();
    tabs.activate_item(item).await.unwrap();

    // the screen asks its parent, not itself
    tabs.active_item()
        .unwrap()
        .screen()
        .request_close(Some(true))
        .unwrap();
    assert_eq!(tabs.items().len(), 1);

    tabs.drain_close_requests().await.unwrap();
    assert!(tabs.items().is_empty());
    assert_eq!(
        log.count(|e| matches!(e, ProbeEvent::Closed { item } if *item == id)),
        1
    );
}

#[tokio::test]
async fn refused_close_request_leaves_the_item_in_place() {
    let log = ProbeLog::new();
    let mut tabs: OneActiveConductor<ProbeItem> = OneActiveConductor::new("tabs");
    tabs.activate();

    let item = ProbeItem::new("document", &log).with_guard(GuardBehavior::Refuse);
    tabs.activate_item(item).await.unwrap();

    tabs.active_item()
        .unwrap()
        .screen()
        .request_close(None)
        .unwrap();
    tabs.drain_close_requests().await.unwrap();

    assert_eq!(tabs.items().len(), 1);
    assert_eq!(
        tabs.active_item().unwrap().state(),
        ScreenState::Active
    );
}

#[tokio::test]
async fn conductors_nest_as_screens() {
    // a one-active shell conducting stack-navigation sections
    let log = ProbeLog::new();
    let mut shell: OneActiveConductor<StackConductor<ProbeItem>> =
        OneActiveConductor::new("shell");
    shell.activate();

    let mut section = StackConductor::new("section-a");
    let leaf = ProbeItem::new("leaf", &log);
    let leaf_id = leaf.id();
    section.activate_item(leaf).await.unwrap();
    let section_id = section.id();

    shell.activate_item(section).await.unwrap();

    // activating the section through the shell reached the leaf
    let section_ref = shell.active_item().unwrap();
    assert_eq!(section_ref.id(), section_id);
    assert_eq!(section_ref.state(), ScreenState::Active);
    assert_eq!(
        log.count(|e| matches!(e, ProbeEvent::Activated { item, .. } if *item == leaf_id)),
        1
    );

    // deactivating the shell cascades down the tree
    shell.deactivate();
    assert_eq!(
        log.count(|e| matches!(e, ProbeEvent::Deactivated { item } if *item == leaf_id)),
        1
    );

    // closing the shell tears the whole tree down
    shell.close().unwrap();
    assert_eq!(
        log.count(|e| matches!(e, ProbeEvent::Closed { item } if *item == leaf_id)),
        1
    );
    assert!(shell.items().is_empty());
}

#[tokio::test]
async fn nested_guard_refusal_vetoes_the_ancestor() {
    let log = ProbeLog::new();
    let mut shell: OneActiveConductor<StackConductor<ProbeItem>> =
        OneActiveConductor::new("shell");
    shell.activate();

    let mut section = StackConductor::new("section");
    section
        .activate_item(ProbeItem::new("dirty", &log).with_guard(GuardBehavior::Refuse))
        .await
        .unwrap();
    shell.activate_item(section).await.unwrap();

    // the leaf's refusal surfaces through the nested aggregate guard
    assert!(!shell.can_close().await);
}

#[tokio::test]
async fn nested_disposal_failure_propagates_to_the_top_level_close() {
    let log = ProbeLog::new();
    let mut shell: OneActiveConductor<StackConductor<ProbeItem>> =
        OneActiveConductor::new("shell");
    shell.activate();

    let mut section = StackConductor::new("section");
    section
        .activate_item(ProbeItem::new("fragile", &log).with_failing_disposal())
        .await
        .unwrap();
    shell.activate_item(section).await.unwrap();

    assert!(shell.close().is_err());
}

#[tokio::test]
async fn reactivation_keeps_identity_and_collection_size() {
    // re-activating the current active item while the conductor is active
    // re-fires activation but changes neither identity nor size
    let log = ProbeLog::new();
    let mut tabs: OneActiveConductor<ProbeItem> = OneActiveConductor::new("tabs");
    tabs.activate();

    let item = ProbeItem::new("doc", &log);
    let id = item.id();
    tabs.activate_item(item).await.unwrap();

    tabs.deactivate_item(id);
    log.clear();
    tabs.activate_existing(id).await.unwrap();

    assert_eq!(
        log.count(|e| matches!(e, ProbeEvent::Activated { item, .. } if *item == id)),
        1
    );
    assert_eq!(tabs.items().len(), 1);
    assert_eq!(tabs.active_id(), Some(id));
}

/// Minimal window-shell host: owns a root screen plus some chrome outside
/// this crate's world, and tears the chrome down once the close commits.
struct WindowHost {
    root: ProbeItem,
    requests: mpsc::UnboundedReceiver<CloseRequest>,
    chrome_open: bool,
}

impl WindowHost {
    fn adopt(mut root: ProbeItem) -> Self {
        let (handle, requests) = close_request_channel(ItemId::new());
        root.child().unwrap().set_parent(Some(handle));
        Self {
            root,
            requests,
            chrome_open: true,
        }
    }
}

#[async_trait]
impl CloseDelegate for WindowHost {
    async fn close_item(&mut self, item: ItemId, _result: Option<bool>) -> Result<bool> {
        if item != self.root.id() {
            return Ok(false);
        }
        if !can_close_item(Some(&self.root)).await {
            return Ok(false);
        }
        if let Some(lifecycle) = self.root.lifecycle() {
            lifecycle.deactivate();
            lifecycle.close()?;
        }
        self.chrome_open = false;
        Ok(true)
    }
}

#[tokio::test]
async fn host_close_delegate_serves_a_root_screen() {
    let log = ProbeLog::new();
    let mut host = WindowHost::adopt(
        ProbeItem::new("root", &log).with_guard(GuardBehavior::Allow),
    );

    host.root.screen().request_close(Some(true)).unwrap();
    let request = host.requests.try_recv().unwrap();
    assert_eq!(request.result, Some(true));

    assert!(host.close_item(request.item, request.result).await.unwrap());
    assert!(!host.chrome_open);
    assert_eq!(host.root.state(), ScreenState::Closed);
}

#[tokio::test]
async fn repeated_close_never_double_disposes() {
    let log = ProbeLog::new();
    let mut shell: SingleConductor<ProbeItem> = SingleConductor::new("shell");
    shell.activate();

    let item = ProbeItem::new("doc", &log)
        .with_guard(GuardBehavior::Slow(true))
        .with_disposal();
    let id = item.id();
    shell.activate_item(item).await.unwrap();

    assert!(shell.close_item(id).await.unwrap());
    assert!(!shell.close_item(id).await.unwrap());
    assert!(!shell.close_item(id).await.unwrap());

    assert_eq!(
        log.count(|e| matches!(e, ProbeEvent::Disposed { item } if *item == id)),
        1
    );
}
