//! S2: `request` installs an inbox wildcard subscription, publishes with
//! a fresh reply-to, and resolves once the fake broker answers it.

use std::thread;
use std::time::Duration;

use nats_client_core::{ConnectOptions, Session};
use nats_test_support::{ClientFrame, FakeBroker};

#[test]
fn request_round_trips_through_the_inbox() {
    let broker = FakeBroker::start();
    let options = ConnectOptions::builder("127.0.0.1", broker.addr.port())
        .connect_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let mut session = Session::connect(options).unwrap();

    let responder = thread::spawn(move || {
        let sub = broker.recv_frame(Duration::from_secs(2)).unwrap();
        let inbox_subject = match sub {
            ClientFrame::Sub { subject, .. } => subject,
            other => panic!("expected Sub, got {other:?}"),
        };
        assert!(inbox_subject.ends_with(".>"));

        let request = broker.recv_frame(Duration::from_secs(2)).unwrap();
        let reply_to = match request {
            ClientFrame::Pub { subject, reply_to, payload } => {
                assert_eq!(subject, "echo");
                assert_eq!(payload, b"hi");
                reply_to.expect("request publishes with a reply-to")
            }
            other => panic!("expected Pub, got {other:?}"),
        };
        broker.send_message(&reply_to, 1, None, b"hi");
    });

    let reply = session.request("echo", b"hi", Duration::from_secs(2)).unwrap();
    assert_eq!(reply.payload, b"hi");

    responder.join().unwrap();
}
