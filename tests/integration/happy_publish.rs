//! S1: a plain publish reaches the wire as a single `PUB` frame with an
//! honest byte count.

use std::time::Duration;

use nats_client_core::{ConnectOptions, Session};
use nats_test_support::{ClientFrame, FakeBroker};

#[test]
fn publish_emits_a_single_pub_frame() {
    let broker = FakeBroker::start();
    let options = ConnectOptions::builder("127.0.0.1", broker.addr.port())
        .connect_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let mut session = Session::connect(options).unwrap();

    session.publish("orders.new", br#"{"id":1}"#).unwrap();

    match broker.recv_frame(Duration::from_secs(2)).unwrap() {
        ClientFrame::Pub { subject, reply_to, payload } => {
            assert_eq!(subject, "orders.new");
            assert_eq!(reply_to, None);
            assert_eq!(payload, br#"{"id":1}"#);
        }
        other => panic!("expected Pub, got {other:?}"),
    }
}
