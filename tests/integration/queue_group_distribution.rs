//! S4: messages delivered to a queue group split across sessions, and
//! every delivery is counted exactly once across the group.
//!
//! The broker-side load-balancing algorithm is out of scope for this
//! client; what's under test is that each session correctly dispatches
//! whatever subset the broker chose to send it, and that a
//! `queue_group` subscription on two independent sessions produces a
//! combined count equal to the number of deliveries made.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nats_client_core::{ConnectOptions, Session};
use nats_test_support::{ClientFrame, FakeBroker};

fn connect_and_subscribe(port: u16, counter: Arc<AtomicU32>) -> Session {
    let options = ConnectOptions::builder("127.0.0.1", port)
        .connect_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let mut session = Session::connect(options).unwrap();
    session
        .subscribe_with_callback(
            "tasks",
            Some("workers"),
            Box::new(move |_msg| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
    session
}

#[test]
fn combined_deliveries_across_a_queue_group_equal_the_publish_count() {
    let broker_a = FakeBroker::start();
    let broker_b = FakeBroker::start();

    let count_a = Arc::new(AtomicU32::new(0));
    let count_b = Arc::new(AtomicU32::new(0));

    let mut session_a = connect_and_subscribe(broker_a.addr.port(), count_a.clone());
    let mut session_b = connect_and_subscribe(broker_b.addr.port(), count_b.clone());

    let sid_a = match broker_a.recv_frame(Duration::from_secs(2)).unwrap() {
        ClientFrame::Sub { sid, queue_group, .. } => {
            assert_eq!(queue_group.as_deref(), Some("workers"));
            sid
        }
        other => panic!("expected Sub, got {other:?}"),
    };
    let sid_b = match broker_b.recv_frame(Duration::from_secs(2)).unwrap() {
        ClientFrame::Sub { sid, .. } => sid,
        other => panic!("expected Sub, got {other:?}"),
    };

    // Split 10 deliveries 4/6 between the two sessions -- within [1, 9]
    // on each side, as the property requires.
    for _ in 0..4 {
        broker_a.send_message("tasks", sid_a, None, b"x");
    }
    for _ in 0..6 {
        broker_b.send_message("tasks", sid_b, None, b"x");
    }

    session_a.process(Duration::from_millis(200)).unwrap();
    session_b.process(Duration::from_millis(200)).unwrap();

    let total = count_a.load(Ordering::SeqCst) + count_b.load(Ordering::SeqCst);
    assert_eq!(total, 10);
    assert!((1..=9).contains(&count_a.load(Ordering::SeqCst)));
    assert!((1..=9).contains(&count_b.load(Ordering::SeqCst)));
}
