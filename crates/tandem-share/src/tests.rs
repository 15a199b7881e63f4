use tandem_core::{Event, Key, Modifiers, MouseButtons};

use crate::backpressure::EventQueue;
use crate::protocol::{MessageChannel, ShareMessage};
use crate::topic::RenderTopic;

fn mouse_move(x: u16, y: u16) -> Event {
    Event::Mouse { x, y, buttons: MouseButtons::empty(), mods: Modifiers::empty() }
}

fn key(k: Key) -> Event {
    Event::Key { key: k, rune: None, mods: Modifiers::empty() }
}

#[tokio::test]
async fn queue_pops_events_in_order() {
    let queue = EventQueue::new(4);
    queue.push(key(Key::Enter));
    queue.push(key(Key::Tab));
    assert_eq!(queue.pop().await, key(Key::Enter));
    assert_eq!(queue.pop().await, key(Key::Tab));
}

#[tokio::test]
async fn full_queue_reclaims_a_stale_mouse_move_first() {
    let queue = EventQueue::new(2);
    queue.push(mouse_move(1, 1));
    queue.push(key(Key::Enter));
    // queue is full; a third push should evict the queued mouse-move, not
    // the keyboard event.
    queue.push(key(Key::Tab));

    assert_eq!(queue.pop().await, key(Key::Enter));
    assert_eq!(queue.pop().await, key(Key::Tab));
}

#[tokio::test]
async fn full_queue_of_keys_drops_the_oldest() {
    let queue = EventQueue::new(2);
    queue.push(key(Key::Enter));
    queue.push(key(Key::Tab));
    queue.push(key(Key::Escape));

    assert_eq!(queue.pop().await, key(Key::Tab));
    assert_eq!(queue.pop().await, key(Key::Escape));
}

#[tokio::test]
async fn pop_waits_for_a_push() {
    let queue = std::sync::Arc::new(EventQueue::new(4));
    let waiter = queue.clone();
    let handle = tokio::spawn(async move { waiter.pop().await });

    tokio::task::yield_now().await;
    queue.push(key(Key::Enter));

    assert_eq!(handle.await.unwrap(), key(Key::Enter));
}

#[test]
fn render_topic_notifies_subscribers_on_publish() {
    let topic = RenderTopic::new();
    let peer = tandem_core::PeerId::new(b"peer-a".to_vec());
    let mut rx = topic.subscribe(peer.clone());
    let before = *rx.borrow();

    topic.publish();

    assert!(rx.has_changed().unwrap());
    assert_ne!(*rx.borrow_and_update(), before);
}

#[test]
fn render_topic_forgets_unsubscribed_peers() {
    let topic = RenderTopic::new();
    let peer = tandem_core::PeerId::new(b"peer-b".to_vec());
    let rx = topic.subscribe(peer.clone());
    topic.unsubscribe(&peer);
    topic.publish();

    // the sender was dropped from the registry, so the channel itself is
    // now closed from the subscriber's point of view.
    assert!(rx.has_changed().is_err());
}

#[tokio::test]
async fn message_channel_round_trips_over_an_in_memory_duplex() {
    let (a, b) = tokio::io::duplex(4096);
    let mut left = MessageChannel::new(a);
    let mut right = MessageChannel::new(b);

    left.send(&ShareMessage::Init).await.unwrap();
    match right.recv().await {
        Some(Ok(ShareMessage::Init)) => {}
        other => panic!("unexpected message: {other:?}"),
    }

    let event = key(Key::Enter);
    left.send(&ShareMessage::Event(event.clone())).await.unwrap();
    match right.recv().await {
        Some(Ok(ShareMessage::Event(got))) => assert_eq!(got, event),
        other => panic!("unexpected message: {other:?}"),
    }
}
