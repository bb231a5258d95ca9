//! S5: bootstrap ensures a stream and a durable pull consumer, a
//! published message is fetched and positively acked, and a second
//! no-wait fetch against an empty consumer comes back empty.

use std::thread;
use std::time::Duration;

use nats_client_core::{ConnectOptions, Session};
use nats_jetstream::{ack, ensure_consumer, ensure_stream, fetch_next, AckKind, FetchOutcome, StreamAdminClient};
use nats_test_support::{ClientFrame, FakeBroker};

fn answer_request(broker: &FakeBroker, expected_suffix: &str, body: serde_json::Value) {
    match broker.recv_frame(Duration::from_secs(2)).unwrap() {
        ClientFrame::Pub { subject, reply_to, .. } => {
            assert!(subject.ends_with(expected_suffix), "got subject {subject}");
            let reply = reply_to.expect("admin requests always carry a reply-to");
            broker.send_message(&reply, 1, None, body.to_string().as_bytes());
        }
        other => panic!("expected Pub, got {other:?}"),
    }
}

#[test]
fn bootstrap_fetch_and_ack_round_trip() {
    let broker = FakeBroker::start();
    let options = ConnectOptions::builder("127.0.0.1", broker.addr.port())
        .connect_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let mut session = Session::connect(options).unwrap();

    let responder = thread::spawn(move || {
        // ensure_stream: STREAM.INFO (not found) -> STREAM.CREATE
        answer_request(
            &broker,
            "STREAM.INFO.S",
            serde_json::json!({"error": {"code": 404, "description": "stream not found"}}),
        );
        answer_request(&broker, "STREAM.CREATE.S", serde_json::json!({"config": {"name": "S"}}));

        // ensure_consumer: CONSUMER.INFO (not found) -> CONSUMER.DURABLE.CREATE
        answer_request(
            &broker,
            "CONSUMER.INFO.S.C",
            serde_json::json!({"error": {"code": 404, "description": "consumer not found"}}),
        );
        answer_request(
            &broker,
            "CONSUMER.DURABLE.CREATE.S.C",
            serde_json::json!({"name": "C"}),
        );

        // publish evt.one -- fire and forget, no reply expected
        match broker.recv_frame(Duration::from_secs(2)).unwrap() {
            ClientFrame::Pub { subject, payload, .. } => {
                assert_eq!(subject, "evt.one");
                assert_eq!(payload, b"p");
            }
            other => panic!("expected Pub, got {other:?}"),
        }

        // first fetch-next: deliver the message with its ack subject as reply-to
        match broker.recv_frame(Duration::from_secs(2)).unwrap() {
            ClientFrame::Pub { subject, reply_to, .. } => {
                assert!(subject.ends_with("CONSUMER.MSG.NEXT.S.C"));
                let reply = reply_to.unwrap();
                broker.send_message(&reply, 1, Some("$JS.ACK.S.C.1.1.1.1700000000.0"), b"p");
            }
            other => panic!("expected Pub, got {other:?}"),
        }

        // the ack publish: fire and forget, literal +ACK payload
        match broker.recv_frame(Duration::from_secs(2)).unwrap() {
            ClientFrame::Pub { subject, payload, .. } => {
                assert_eq!(subject, "$JS.ACK.S.C.1.1.1.1700000000.0");
                assert_eq!(payload, b"+ACK");
            }
            other => panic!("expected Pub, got {other:?}"),
        }

        // second fetch-next: respond with a 404 status header -- empty consumer
        match broker.recv_frame(Duration::from_secs(2)).unwrap() {
            ClientFrame::Pub { subject, reply_to, .. } => {
                assert!(subject.ends_with("CONSUMER.MSG.NEXT.S.C"));
                let reply = reply_to.unwrap();
                let mut headers = nats_protocol::Headers::new();
                headers.insert("Status", "404");
                broker.send_hmsg(&reply, 1, None, &headers, b"");
            }
            other => panic!("expected Pub, got {other:?}"),
        }
    });

    {
        let mut admin = StreamAdminClient::new(&mut session, None);
        ensure_stream(&mut admin, "S", "evt").unwrap();
        ensure_consumer(&mut admin, "S", "C", "evt.>").unwrap();
    }

    session.publish("evt.one", b"p").unwrap();

    let outcome = {
        let mut admin = StreamAdminClient::new(&mut session, None);
        fetch_next(&mut admin, "S", "C", false, Duration::from_secs(2)).unwrap()
    };
    let consumed = match outcome {
        FetchOutcome::Message(m) => m,
        FetchOutcome::Empty => panic!("expected a message"),
    };
    assert_eq!(consumed.stream, "S");
    assert_eq!(consumed.consumer, "C");
    assert_eq!(consumed.stream_seq, 1);
    assert_eq!(consumed.message.payload, b"p");

    ack(&mut session, &consumed, AckKind::Ack).unwrap();

    let second = {
        let mut admin = StreamAdminClient::new(&mut session, None);
        fetch_next(&mut admin, "S", "C", true, Duration::from_secs(2)).unwrap()
    };
    assert!(matches!(second, FetchOutcome::Empty));

    responder.join().unwrap();
}
