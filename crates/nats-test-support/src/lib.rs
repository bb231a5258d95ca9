//! nats-test-support: a scriptable fake broker for exercising a real
//! `Session` end to end without a live server.
//!
//! Mirrors the shape of a typical mock transport fixture: a background
//! thread owns the one accepted connection and speaks just enough of
//! the wire protocol to drive a handshake, while the test thread drains
//! a channel of decoded client frames and pushes raw bytes back through
//! a second channel to script the broker's side of the conversation.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nats_protocol::Headers;

/// A decoded client->broker frame, as seen from the broker's side.
#[derive(Debug, Clone)]
pub enum ClientFrame {
    Pub {
        subject: String,
        reply_to: Option<String>,
        payload: Vec<u8>,
    },
    Hpub {
        subject: String,
        reply_to: Option<String>,
        headers: Headers,
        payload: Vec<u8>,
    },
    Sub {
        subject: String,
        queue_group: Option<String>,
        sid: u64,
    },
    Unsub {
        sid: u64,
        max_msgs: Option<u64>,
    },
    Ping,
    Pong,
}

/// A single fake-broker connection. `start` performs the INFO/CONNECT/
/// PING/PONG handshake on a background thread and then hands inbound
/// frames to the test thread via [`FakeBroker::recv_frame`].
pub struct FakeBroker {
    pub addr: SocketAddr,
    incoming: Receiver<ClientFrame>,
    outgoing: Sender<Vec<u8>>,
    _handle: JoinHandle<()>,
}

impl FakeBroker {
    pub fn start() -> FakeBroker {
        Self::start_with_info(default_info_json())
    }

    pub fn start_with_info(info_json: String) -> FakeBroker {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind a free local port");
        let addr = listener.local_addr().expect("listener has a local address");
        let (in_tx, in_rx) = mpsc::channel();
        let (out_tx, out_rx) = mpsc::channel::<Vec<u8>>();

        let handle = thread::spawn(move || {
            let _ = run_connection(listener, info_json, in_tx, out_rx);
        });

        FakeBroker {
            addr,
            incoming: in_rx,
            outgoing: out_tx,
            _handle: handle,
        }
    }

    pub fn recv_frame(&self, timeout: Duration) -> Option<ClientFrame> {
        self.incoming.recv_timeout(timeout).ok()
    }

    pub fn send_raw(&self, bytes: Vec<u8>) {
        let _ = self.outgoing.send(bytes);
    }

    pub fn send_message(&self, subject: &str, sid: u64, reply_to: Option<&str>, payload: &[u8]) {
        let mut out = Vec::new();
        out.extend_from_slice(b"MSG ");
        out.extend_from_slice(subject.as_bytes());
        out.push(b' ');
        out.extend_from_slice(sid.to_string().as_bytes());
        out.push(b' ');
        if let Some(reply) = reply_to {
            out.extend_from_slice(reply.as_bytes());
            out.push(b' ');
        }
        out.extend_from_slice(payload.len().to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(payload);
        out.extend_from_slice(b"\r\n");
        self.send_raw(out);
    }

    pub fn send_hmsg(
        &self,
        subject: &str,
        sid: u64,
        reply_to: Option<&str>,
        headers: &Headers,
        payload: &[u8],
    ) {
        let hdr_block = headers.encode();
        let total_len = hdr_block.len() + payload.len();
        let mut out = Vec::new();
        out.extend_from_slice(b"HMSG ");
        out.extend_from_slice(subject.as_bytes());
        out.push(b' ');
        out.extend_from_slice(sid.to_string().as_bytes());
        out.push(b' ');
        if let Some(reply) = reply_to {
            out.extend_from_slice(reply.as_bytes());
            out.push(b' ');
        }
        out.extend_from_slice(hdr_block.len().to_string().as_bytes());
        out.push(b' ');
        out.extend_from_slice(total_len.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&hdr_block);
        out.extend_from_slice(payload);
        out.extend_from_slice(b"\r\n");
        self.send_raw(out);
    }

    pub fn send_err(&self, reason: &str) {
        self.send_raw(format!("-ERR '{reason}'\r\n").into_bytes());
    }
}

fn default_info_json() -> String {
    serde_json::json!({
        "server_id": "fake-broker",
        "version": "0.0.0-fake",
        "max_payload": 1_048_576,
        "headers": true,
        "auth_required": false,
        "tls_required": false,
        "jetstream": true,
    })
    .to_string()
}

fn run_connection(
    listener: TcpListener,
    info_json: String,
    frames: Sender<ClientFrame>,
    outgoing: Receiver<Vec<u8>>,
) -> io::Result<()> {
    let (mut stream, _) = listener.accept()?;
    stream.write_all(format!("INFO {info_json}\r\n").as_bytes())?;
    stream.flush()?;

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut connect_line = String::new();
    reader.read_line(&mut connect_line)?;
    let mut ping_line = String::new();
    reader.read_line(&mut ping_line)?;
    stream.write_all(b"PONG\r\n")?;
    stream.flush()?;

    loop {
        while let Ok(bytes) = outgoing.try_recv() {
            if stream.write_all(&bytes).is_err() {
                return Ok(());
            }
            stream.flush().ok();
        }

        stream.set_read_timeout(Some(Duration::from_millis(50))).ok();
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => return Ok(()),
            Ok(_) => {
                if let Some(frame) = parse_client_frame(&line, &mut reader) {
                    if matches!(frame, ClientFrame::Ping) {
                        stream.write_all(b"PONG\r\n")?;
                        stream.flush()?;
                    }
                    if frames.send(frame).is_err() {
                        return Ok(());
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                continue;
            }
            Err(_) => return Ok(()),
        }
    }
}

fn parse_client_frame(line: &str, reader: &mut BufReader<TcpStream>) -> Option<ClientFrame> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return None;
    }
    let mut upper_prefix = String::new();
    for c in line.chars().take(7) {
        upper_prefix.push(c.to_ascii_uppercase());
    }

    if upper_prefix.starts_with("PING") {
        return Some(ClientFrame::Ping);
    }
    if upper_prefix.starts_with("PONG") {
        return Some(ClientFrame::Pong);
    }
    if upper_prefix.starts_with("SUB ") {
        let fields: Vec<&str> = line[4..].split_whitespace().collect();
        return match fields.len() {
            2 => Some(ClientFrame::Sub {
                subject: fields[0].to_string(),
                queue_group: None,
                sid: fields[1].parse().ok()?,
            }),
            3 => Some(ClientFrame::Sub {
                subject: fields[0].to_string(),
                queue_group: Some(fields[1].to_string()),
                sid: fields[2].parse().ok()?,
            }),
            _ => None,
        };
    }
    if upper_prefix.starts_with("UNSUB ") {
        let fields: Vec<&str> = line[6..].split_whitespace().collect();
        let sid = fields.first()?.parse().ok()?;
        let max_msgs = fields.get(1).and_then(|s| s.parse().ok());
        return Some(ClientFrame::Unsub { sid, max_msgs });
    }
    if upper_prefix.starts_with("HPUB ") {
        let fields: Vec<&str> = line[5..].split_whitespace().collect();
        let (subject, reply_to, hdr_len, total_len) = match fields.len() {
            3 => (fields[0], None, fields[1], fields[2]),
            4 => (fields[0], Some(fields[1]), fields[2], fields[3]),
            _ => return None,
        };
        let hdr_len: usize = hdr_len.parse().ok()?;
        let total_len: usize = total_len.parse().ok()?;
        let mut raw = vec![0u8; total_len + 2];
        reader.read_exact(&mut raw).ok()?;
        raw.truncate(total_len);
        let headers = Headers::parse(&raw[..hdr_len]).ok()?;
        let payload = raw[hdr_len..].to_vec();
        return Some(ClientFrame::Hpub {
            subject: subject.to_string(),
            reply_to: reply_to.map(String::from),
            headers,
            payload,
        });
    }
    if upper_prefix.starts_with("PUB ") {
        let fields: Vec<&str> = line[4..].split_whitespace().collect();
        let (subject, reply_to, size) = match fields.len() {
            2 => (fields[0], None, fields[1]),
            3 => (fields[0], Some(fields[1]), fields[2]),
            _ => return None,
        };
        let size: usize = size.parse().ok()?;
        let mut payload = vec![0u8; size + 2];
        reader.read_exact(&mut payload).ok()?;
        payload.truncate(size);
        return Some(ClientFrame::Pub {
            subject: subject.to_string(),
            reply_to: reply_to.map(String::from),
            payload,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpStream as StdTcpStream;

    #[test]
    fn fake_broker_completes_handshake_and_observes_pub() {
        let broker = FakeBroker::start();
        let mut client = StdTcpStream::connect(broker.addr).unwrap();

        let mut buf = [0u8; 256];
        let n = client.read(&mut buf).unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("INFO "));

        client.write_all(b"CONNECT {}\r\n").unwrap();
        client.write_all(b"PING\r\n").unwrap();
        client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let n = client.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"PONG\r\n");

        client.write_all(b"PUB orders.new 8\r\n{\"id\":1}\r\n").unwrap();
        let frame = broker.recv_frame(Duration::from_secs(2)).unwrap();
        match frame {
            ClientFrame::Pub { subject, payload, .. } => {
                assert_eq!(subject, "orders.new");
                assert_eq!(payload, b"{\"id\":1}");
            }
            other => panic!("expected Pub, got {other:?}"),
        }
    }
}
