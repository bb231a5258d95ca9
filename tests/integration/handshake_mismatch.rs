//! S6: a server advertising `tls_required` fails the handshake locally
//! before a `CONNECT` frame is ever written, when the client has not
//! opted into TLS.

use std::time::Duration;

use nats_client_core::{ClientError, ConnectError, ConnectOptions, Session};
use nats_test_support::FakeBroker;

#[test]
fn tls_required_without_local_tls_fails_before_connect_is_sent() {
    let info = serde_json::json!({
        "server_id": "fake-broker",
        "version": "0.0.0-fake",
        "max_payload": 1_048_576,
        "headers": true,
        "auth_required": false,
        "tls_required": true,
        "jetstream": true,
    })
    .to_string();
    let broker = FakeBroker::start_with_info(info);

    let options = ConnectOptions::builder("127.0.0.1", broker.addr.port())
        .connect_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let result = Session::connect(options);

    assert!(matches!(
        result,
        Err(ClientError::Connect(ConnectError::TlsHandshake(_)))
    ));

    // The broker is left waiting on a CONNECT line that never arrives;
    // confirm nothing was forwarded as a parsed client frame.
    assert!(broker.recv_frame(Duration::from_millis(100)).is_none());
}
