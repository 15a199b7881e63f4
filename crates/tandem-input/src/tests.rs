use std::sync::{Arc, Mutex};
use std::time::Duration;

use tandem_core::{Event, InputRouter, Key, Modifiers, MouseButtons, PeerId};
use tandem_layout::LayoutTree;

use super::Router;

fn tree_with_one_pane() -> Arc<Mutex<LayoutTree>> {
    let (tree, _root) = LayoutTree::with_initial_pane();
    Arc::new(Mutex::new(tree))
}

fn ctrl_b() -> Event {
    Event::Key {
        key: Key::Char('b'),
        rune: None,
        mods: Modifiers { ctrl: true, ..Modifiers::default() },
    }
}

fn rune(c: char) -> Event {
    Event::Key { key: Key::Char(c), rune: Some(c), mods: Modifiers::default() }
}

#[test]
fn leader_then_percent_within_window_splits_vertically() {
    let tree = tree_with_one_pane();
    let mut router = Router::new(tree.clone());
    let peer = PeerId::local();

    assert_eq!(router.route(&peer, ctrl_b()), None);
    assert_eq!(router.route(&peer, rune('%')), None);

    assert_eq!(tree.lock().unwrap().pane_ids().len(), 2);
}

#[test]
fn leader_then_quote_within_window_splits_horizontally() {
    let tree = tree_with_one_pane();
    let mut router = Router::new(tree.clone());
    let peer = PeerId::local();

    router.route(&peer, ctrl_b());
    router.route(&peer, rune('"'));

    assert_eq!(tree.lock().unwrap().pane_ids().len(), 2);
}

#[test]
fn leader_then_x_kills_focused_pane() {
    let tree = tree_with_one_pane();
    let mut router = Router::new(tree.clone());
    let peer = PeerId::local();

    router.route(&peer, ctrl_b());
    router.route(&peer, rune('%'));
    assert_eq!(tree.lock().unwrap().pane_ids().len(), 2);

    router.route(&peer, ctrl_b());
    router.route(&peer, rune('x'));
    assert_eq!(tree.lock().unwrap().pane_ids().len(), 1);
}

#[test]
fn leader_after_window_expires_sends_literal_rune() {
    let tree = tree_with_one_pane();
    let mut router = Router::new(tree.clone()).with_window(Duration::from_millis(10));
    let peer = PeerId::local();

    router.route(&peer, ctrl_b());
    std::thread::sleep(Duration::from_millis(30));
    let result = router.route(&peer, rune('%'));

    assert_eq!(tree.lock().unwrap().pane_ids().len(), 1);
    assert!(result.is_some());
}

#[test]
fn leader_rune_that_is_not_recognized_passes_through() {
    let tree = tree_with_one_pane();
    let mut router = Router::new(tree.clone());
    let peer = PeerId::local();

    router.route(&peer, ctrl_b());
    let result = router.route(&peer, rune('q'));

    assert!(result.is_some());
    assert_eq!(tree.lock().unwrap().pane_ids().len(), 1);
}

#[test]
fn plain_key_with_no_leader_routes_to_focused_pane() {
    let tree = tree_with_one_pane();
    let root = tree.lock().unwrap().pane_ids()[0];
    let mut router = Router::new(tree);
    let peer = PeerId::local();

    let result = router.route(&peer, rune('a'));

    assert_eq!(result, Some(root));
}

#[test]
fn hotkey_under_one_peer_does_not_affect_another_peers_focus() {
    let tree = tree_with_one_pane();
    let mut router = Router::new(tree.clone());
    let peer_a = PeerId::new(b"alice".to_vec());
    let peer_b = PeerId::new(b"bob".to_vec());

    router.route(&peer_a, ctrl_b());
    router.route(&peer_a, rune('%'));

    let focused_b_before = tree.lock().unwrap().focused_pane(&peer_b);
    let result_b = router.route(&peer_b, rune('z'));
    assert_eq!(result_b, focused_b_before);
}

#[test]
fn resize_event_is_never_routed_to_a_pane() {
    let tree = tree_with_one_pane();
    let mut router = Router::new(tree);
    let peer = PeerId::local();

    let result = router.route(&peer, Event::Resize { cols: 80, rows: 24 });
    assert_eq!(result, None);
}

#[test]
fn mouse_move_bursts_are_coalesced() {
    let tree = tree_with_one_pane();
    let mut router = Router::new(tree);
    let peer = PeerId::local();

    let mv = Event::Mouse { x: 1, y: 1, buttons: MouseButtons::NONE, mods: Modifiers::default() };
    assert!(router.route(&peer, mv.clone()).is_some());
    // Immediately repeated plain moves within the burst window are dropped.
    assert_eq!(router.route(&peer, mv), None);
}

#[test]
fn mouse_click_is_never_coalesced() {
    let tree = tree_with_one_pane();
    let root = tree.lock().unwrap().pane_ids()[0];
    let mut router = Router::new(tree);
    let peer = PeerId::local();

    let click = Event::Mouse { x: 1, y: 1, buttons: MouseButtons::LEFT, mods: Modifiers::default() };
    assert_eq!(router.route(&peer, click.clone()), Some(root));
    assert_eq!(router.route(&peer, click), Some(root));
}

#[test]
fn is_armed_reflects_leader_state() {
    let tree = tree_with_one_pane();
    let mut router = Router::new(tree).with_window(Duration::from_millis(10));
    let peer = PeerId::local();

    assert!(!router.is_armed(&peer));
    router.route(&peer, ctrl_b());
    assert!(router.is_armed(&peer));
    std::thread::sleep(Duration::from_millis(30));
    assert!(!router.is_armed(&peer));
}
