//! S3: a request with no reply fails with `TimeoutError::Request` once
//! its deadline elapses.

use std::time::Duration;

use nats_client_core::{ClientError, ConnectOptions, Session, TimeoutError};
use nats_test_support::FakeBroker;

#[test]
fn unanswered_request_times_out() {
    let broker = FakeBroker::start();
    let options = ConnectOptions::builder("127.0.0.1", broker.addr.port())
        .connect_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let mut session = Session::connect(options).unwrap();

    let result = session.request("nobody", b"", Duration::from_millis(100));
    assert!(matches!(result, Err(ClientError::Timeout(TimeoutError::Request))));
}

#[test]
fn zero_timeout_fails_immediately() {
    let broker = FakeBroker::start();
    let options = ConnectOptions::builder("127.0.0.1", broker.addr.port())
        .connect_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let mut session = Session::connect(options).unwrap();

    let result = session.request("nobody", b"", Duration::ZERO);
    assert!(matches!(result, Err(ClientError::Timeout(TimeoutError::Request))));
}
