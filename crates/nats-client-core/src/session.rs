//! The session: owns the socket, drives the handshake, and multiplexes
//! subscriptions and in-flight requests over a single connection.
//!
//! There is no background thread. Every inbound frame is only read and
//! dispatched from inside [`Session::process`] (or a blocking call like
//! [`Session::request`] that loops on it internally) -- callers decide
//! when the client yields control.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use nats_protocol::codec::{
    encode_connect, encode_hpub, encode_ping, encode_pong, encode_pub, encode_sub, encode_unsub,
    parse_err, parse_hmsg, parse_info, parse_msg, detect_kind, LineKind,
};
use nats_protocol::{ConnectInfo, Headers, ProtocolError, ServerInfo};

use crate::config::{ConnectOptions, Credentials, ServerCapabilities};
use crate::error::{ClientError, ConnectError, TimeoutError};
use crate::message::Message;
use crate::request::{PendingRequestTable, PollOutcome};
use crate::subject::{validate_publish, validate_subscribe};
use crate::subscription::{Delivery, Subscription, SubscriptionRegistry};

/// A duplex byte stream a `Session` can be built on. `TcpStream` is the
/// only implementation provided; a caller wanting TLS wraps their own
/// stream (e.g. a `rustls::StreamOwned`) and hands it to
/// [`Session::connect_with_stream`] -- the session itself performs no
/// handshake beyond the capability check in [`ServerCapabilities::check_tls`].
pub trait Transport: Read + Write + Send {
    fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()>;
    fn shutdown(&self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, dur)
    }

    fn shutdown(&self) -> io::Result<()> {
        TcpStream::shutdown(self, std::net::Shutdown::Both)
    }
}

/// Bounded deadline for a liveness `PONG` reply, independent of the
/// user-configurable interval between health checks.
const HEALTH_CHECK_PONG_DEADLINE: Duration = Duration::from_secs(2);
/// A health check is due once both time-since-last-activity and
/// time-since-last-check exceed this.
const HEALTH_CHECK_DUE_AFTER: Duration = Duration::from_secs(5);
/// Read timeout used for the non-blocking readability probe between
/// explicit I/O -- near enough to zero to never meaningfully block.
const READABILITY_PROBE_TIMEOUT: Duration = Duration::from_micros(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingInfo,
    AwaitingPong,
    Ready,
    Closing,
    Closed,
}

pub struct Session {
    stream: Box<dyn Transport>,
    state: SessionState,
    buf: Vec<u8>,
    buf_pos: usize,
    capabilities: ServerCapabilities,
    options: ConnectOptions,
    subs: SubscriptionRegistry,
    pending: PendingRequestTable,
    inbox_prefix: String,
    inbox_sid: Option<u64>,
    last_activity: Instant,
    last_ping_sent: Instant,
    last_health_check: Instant,
    awaiting_pong: bool,
    failed_pings: u32,
    on_server_error: Option<Box<dyn Fn(&str) + Send>>,
}

impl Session {
    pub fn connect(options: ConnectOptions) -> Result<Self, ClientError> {
        let deadline = Instant::now() + options.connect_timeout;
        let stream = TcpStream::connect((options.host.as_str(), options.port))
            .map_err(map_connect_error)?;
        stream.set_nodelay(true).ok();
        Self::handshake(Box::new(stream), options, deadline)
    }

    /// Build a session on a caller-supplied transport, e.g. an
    /// already-established TLS stream. The handshake proceeds exactly as
    /// in [`Session::connect`].
    pub fn connect_with_stream(
        stream: Box<dyn Transport>,
        options: ConnectOptions,
    ) -> Result<Self, ClientError> {
        let deadline = Instant::now() + options.connect_timeout;
        Self::handshake(stream, options, deadline)
    }

    fn handshake(
        stream: Box<dyn Transport>,
        options: ConnectOptions,
        deadline: Instant,
    ) -> Result<Self, ClientError> {
        let inbox_prefix = options.inbox_prefix.clone();
        let now = Instant::now();
        let mut session = Session {
            stream,
            state: SessionState::Connecting,
            buf: Vec::new(),
            buf_pos: 0,
            capabilities: ServerCapabilities(ServerInfo {
                server_id: String::new(),
                version: String::new(),
                max_payload: 1024 * 1024,
                headers: false,
                auth_required: false,
                tls_required: false,
                stream_layer_enabled: false,
            }),
            options,
            subs: SubscriptionRegistry::new(),
            pending: PendingRequestTable::new(),
            inbox_prefix,
            inbox_sid: None,
            last_activity: now,
            last_ping_sent: now,
            last_health_check: now,
            awaiting_pong: false,
            failed_pings: 0,
            on_server_error: None,
        };

        session.state = SessionState::AwaitingInfo;
        let line = session
            .read_line(deadline)?
            .ok_or(TimeoutError::Read)?;
        let info_json = parse_info(&line)?;
        let server_info = ServerInfo::parse(&info_json)
            .map_err(|e| ProtocolError::InvalidInfo(e.to_string()))?;
        let capabilities = ServerCapabilities(server_info);
        capabilities.check_tls(&session.options.tls)?;
        capabilities.check_auth(&session.options.credentials)?;
        session.capabilities = capabilities;

        session.state = SessionState::Connecting;
        let connect_info = build_connect_info(&session.options);
        session.write_frame(&encode_connect(&connect_info))?;
        session.write_frame(&encode_ping())?;

        session.state = SessionState::AwaitingPong;
        loop {
            let line = session
                .read_line(deadline)?
                .ok_or(TimeoutError::Read)?;
            match detect_kind(line.as_bytes())? {
                LineKind::Ok => continue,
                LineKind::Pong => break,
                LineKind::Err => {
                    return Err(ConnectError::AuthFailed(parse_err(&line)?).into());
                }
                _ => {
                    return Err(
                        ProtocolError::UnexpectedFrame("unexpected frame during handshake".into())
                            .into(),
                    );
                }
            }
        }

        session.state = SessionState::Ready;
        let now = Instant::now();
        session.last_activity = now;
        session.last_ping_sent = now;
        session.last_health_check = now;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `true` only in the `Ready` state -- the single user-visible
    /// predicate the state machine is required to expose.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    pub fn set_error_sink(&mut self, sink: Box<dyn Fn(&str) + Send>) {
        self.on_server_error = Some(sink);
    }

    /// User-initiated disconnect. Closes the socket, clears subscriptions
    /// and pending requests, and leaves the session in `Closed` -- any
    /// later operation fails fast with `ConnectError::NotConnected`, and
    /// any in-flight `request`/`fetch-next` fails at its next pump tick
    /// for the same reason. Idempotent.
    pub fn close(&mut self) -> Result<(), ClientError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closing;
        let result = self.stream.shutdown();
        self.subs.clear();
        self.pending.clear();
        self.inbox_sid = None;
        self.state = SessionState::Closed;
        result.map_err(ClientError::Io)
    }

    /// Marks the session `Closed` after a fatal I/O condition (remote
    /// EOF, write failure, exhausted liveness budget) discovered mid-pump
    /// -- same teardown as [`Session::close`], without the caller asking
    /// for it.
    fn mark_disconnected(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closing;
        let _ = self.stream.shutdown();
        self.subs.clear();
        self.pending.clear();
        self.inbox_sid = None;
        self.state = SessionState::Closed;
    }

    // -----------------------------------------------------------------
    // Publish
    // -----------------------------------------------------------------

    pub fn publish(&mut self, subject: &str, payload: &[u8]) -> Result<(), ClientError> {
        self.publish_with_reply(subject, None, payload)
    }

    pub fn publish_with_reply(
        &mut self,
        subject: &str,
        reply_to: Option<&str>,
        payload: &[u8],
    ) -> Result<(), ClientError> {
        self.ensure_ready()?;
        validate_publish(subject)?;
        if let Some(reply) = reply_to {
            validate_publish(reply)?;
        }
        self.check_payload_size(payload.len())?;
        let frame = encode_pub(subject, reply_to, payload);
        self.write_frame(&frame)
    }

    pub fn publish_with_headers(
        &mut self,
        subject: &str,
        headers: &Headers,
        payload: &[u8],
    ) -> Result<(), ClientError> {
        self.ensure_ready()?;
        validate_publish(subject)?;
        if !self.capabilities.headers_supported() {
            return Err(ConnectError::Other("server does not support headers".into()).into());
        }
        self.check_payload_size(payload.len())?;
        let frame = encode_hpub(subject, None, headers, payload);
        self.write_frame(&frame)
    }

    fn check_payload_size(&self, len: usize) -> Result<(), ClientError> {
        if len as i64 > self.capabilities.max_payload() {
            return Err(ConnectError::Other(format!(
                "payload of {len} bytes exceeds server max_payload of {}",
                self.capabilities.max_payload()
            ))
            .into());
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Subscribe
    // -----------------------------------------------------------------

    pub fn subscribe(&mut self, subject: &str, queue_group: Option<&str>) -> Result<u64, ClientError> {
        self.subscribe_inner(subject, queue_group, Delivery::Mailbox(Vec::new()))
    }

    pub fn subscribe_with_callback(
        &mut self,
        subject: &str,
        queue_group: Option<&str>,
        handler: Box<dyn FnMut(Message) + Send>,
    ) -> Result<u64, ClientError> {
        self.subscribe_inner(subject, queue_group, Delivery::Callback(handler))
    }

    fn subscribe_inner(
        &mut self,
        subject: &str,
        queue_group: Option<&str>,
        delivery: Delivery,
    ) -> Result<u64, ClientError> {
        self.ensure_ready()?;
        validate_subscribe(subject)?;
        let sid = self.subs.allocate_sid();
        self.write_frame(&encode_sub(subject, queue_group, sid))?;
        self.subs.insert(
            sid,
            Subscription {
                subject: subject.to_string(),
                queue_group: queue_group.map(String::from),
                remaining: None,
                delivery,
            },
        );
        Ok(sid)
    }

    pub fn unsubscribe(&mut self, sid: u64, max_msgs: Option<u64>) -> Result<(), ClientError> {
        self.ensure_ready()?;
        self.write_frame(&encode_unsub(sid, max_msgs))?;
        match max_msgs {
            None => {
                self.subs.remove(sid);
            }
            Some(n) => {
                if let Some(sub) = self.subs.get_mut(sid) {
                    sub.remaining = Some(n);
                }
            }
        }
        Ok(())
    }

    /// Drain one buffered message from a mailbox-backed subscription, if
    /// any has arrived. Does not block or read from the socket -- call
    /// [`Session::process`] first to pump new deliveries in.
    pub fn try_next_msg(&mut self, sid: u64) -> Option<Message> {
        match &mut self.subs.get_mut(sid)?.delivery {
            Delivery::Mailbox(mailbox) if !mailbox.is_empty() => Some(mailbox.remove(0)),
            _ => None,
        }
    }

    // -----------------------------------------------------------------
    // Request/reply
    // -----------------------------------------------------------------

    pub fn request(
        &mut self,
        subject: &str,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Message, ClientError> {
        self.ensure_ready()?;
        validate_publish(subject)?;
        if timeout.is_zero() {
            return Err(TimeoutError::Request.into());
        }
        if self.inbox_sid.is_none() {
            let wildcard = format!("{}.>", self.inbox_prefix);
            let sid = self.subs.allocate_sid();
            self.write_frame(&encode_sub(&wildcard, None, sid))?;
            self.subs.insert(
                sid,
                Subscription {
                    subject: wildcard,
                    queue_group: None,
                    remaining: None,
                    delivery: Delivery::Mailbox(Vec::new()),
                },
            );
            self.inbox_sid = Some(sid);
        }

        let deadline = Instant::now() + timeout;
        let reply_subject = self.pending.register(&self.inbox_prefix, deadline);
        self.write_frame(&encode_pub(subject, Some(&reply_subject), payload))?;

        loop {
            let now = Instant::now();
            if let Some(outcome) = self.pending.poll(&reply_subject, now) {
                return match outcome {
                    PollOutcome::Ready(msg) => Ok(msg),
                    PollOutcome::Expired => Err(TimeoutError::Request.into()),
                };
            }
            if now >= deadline {
                self.pending.remove(&reply_subject);
                return Err(TimeoutError::Request.into());
            }
            let step = (deadline - now).min(Duration::from_millis(100));
            self.process(step)?;
        }
    }

    // -----------------------------------------------------------------
    // I/O pump
    // -----------------------------------------------------------------

    /// Read and dispatch whatever control lines arrive within `timeout`.
    /// Returns as soon as the socket goes quiet; never blocks past the
    /// deadline waiting for more.
    pub fn process(&mut self, timeout: Duration) -> Result<(), ClientError> {
        self.ensure_ready()?;
        let deadline = Instant::now() + timeout;
        loop {
            match self.read_line(deadline)? {
                Some(line) => self.handle_line(&line, deadline)?,
                None => break,
            }
            if Instant::now() >= deadline {
                break;
            }
        }
        self.maybe_health_check()
    }

    /// Liveness: send `PING`, await `PONG` within
    /// [`HEALTH_CHECK_PONG_DEADLINE`], and fail the session once
    /// `failed_pings` reaches the configured threshold. A check is due
    /// once both time-since-last-activity and time-since-last-check
    /// exceed [`HEALTH_CHECK_DUE_AFTER`]; otherwise a non-blocking
    /// readability probe watches for remote EOF in between.
    fn maybe_health_check(&mut self) -> Result<(), ClientError> {
        let now = Instant::now();
        if self.awaiting_pong {
            if now.duration_since(self.last_ping_sent) > HEALTH_CHECK_PONG_DEADLINE {
                self.failed_pings += 1;
                self.awaiting_pong = false;
                self.last_health_check = now;
                if self.failed_pings >= self.options.max_outstanding_pings {
                    self.mark_disconnected();
                    return Err(ConnectError::Disconnected.into());
                }
            }
            return Ok(());
        }

        let due = now.duration_since(self.last_activity) > HEALTH_CHECK_DUE_AFTER
            && now.duration_since(self.last_health_check) > HEALTH_CHECK_DUE_AFTER;
        if !due {
            return self.probe_readability();
        }

        self.write_frame(&encode_ping())?;
        self.last_ping_sent = now;
        self.last_health_check = now;
        self.awaiting_pong = true;
        Ok(())
    }

    /// Non-blocking peek at the socket to detect a remote close between
    /// explicit reads, without consuming more than what's already there.
    fn probe_readability(&mut self) -> Result<(), ClientError> {
        self.stream.set_read_timeout(Some(READABILITY_PROBE_TIMEOUT))?;
        let mut chunk = [0u8; 256];
        match self.stream.read(&mut chunk) {
            Ok(0) => {
                self.mark_disconnected();
                Err(ConnectError::Disconnected.into())
            }
            Ok(n) => {
                self.buf.extend_from_slice(&chunk[..n]);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => Ok(()),
            Err(e) => {
                self.mark_disconnected();
                Err(e.into())
            }
        }
    }

    fn handle_line(&mut self, line: &str, deadline: Instant) -> Result<(), ClientError> {
        match detect_kind(line.as_bytes())? {
            LineKind::Ping => self.write_frame(&encode_pong())?,
            LineKind::Pong => {
                self.awaiting_pong = false;
                self.failed_pings = 0;
            }
            LineKind::Ok => {}
            LineKind::Err => {
                let reason = parse_err(line)?;
                match &self.on_server_error {
                    Some(sink) => sink(&reason),
                    None => tracing::warn!(reason = %reason, "server reported an error"),
                }
            }
            LineKind::Info => {
                if let Ok(json) = parse_info(line) {
                    if let Ok(info) = ServerInfo::parse(&json) {
                        self.capabilities = ServerCapabilities(info);
                    }
                }
            }
            LineKind::Msg => self.handle_msg(line, deadline, false)?,
            LineKind::Hmsg => self.handle_msg(line, deadline, true)?,
        }
        Ok(())
    }

    fn handle_msg(&mut self, line: &str, deadline: Instant, headered: bool) -> Result<(), ClientError> {
        let header = if headered { parse_hmsg(line)? } else { parse_msg(line)? };
        let raw = self.read_payload(header.total_len, deadline)?;
        let (headers, payload) = if headered {
            let hdr_len = header.hdr_len.unwrap_or(0);
            let headers = Headers::parse(&raw[..hdr_len])?;
            (Some(headers), raw[hdr_len..].to_vec())
        } else {
            (None, raw)
        };
        let sid: u64 = header
            .sid
            .parse()
            .map_err(|_| ProtocolError::malformed(line.as_bytes()))?;
        let message = Message {
            subject: header.subject.clone(),
            reply_to: header.reply_to.clone(),
            headers,
            payload,
            sid,
        };

        if self.pending.is_inbox_subject(&self.inbox_prefix, &header.subject) {
            if !self.pending.fulfil(&header.subject, message) {
                tracing::trace!(subject = %header.subject, "dropped unmatched or duplicate reply");
            }
            return Ok(());
        }

        let should_remove = self.subs.note_delivered(sid);
        if let Some(sub) = self.subs.get_mut(sid) {
            match &mut sub.delivery {
                Delivery::Callback(cb) => cb(message),
                Delivery::Mailbox(mailbox) => mailbox.push(message),
            }
        }
        if should_remove {
            self.subs.remove(sid);
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Raw buffered I/O
    // -----------------------------------------------------------------

    fn ensure_ready(&self) -> Result<(), ClientError> {
        if self.state != SessionState::Ready {
            return Err(ConnectError::NotConnected.into());
        }
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), ClientError> {
        match self.stream.write_all(frame) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::WriteZero => {
                self.mark_disconnected();
                return Err(ConnectError::Disconnected.into());
            }
            Err(e) => {
                self.mark_disconnected();
                return Err(e.into());
            }
        }
        self.stream.flush()?;
        self.last_activity = Instant::now();
        Ok(())
    }

    fn fill_buffer(&mut self, deadline: Instant) -> Result<bool, ClientError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(false);
        }
        self.stream.set_read_timeout(Some(remaining))?;
        let mut chunk = [0u8; 4096];
        match self.stream.read(&mut chunk) {
            Ok(0) => {
                self.mark_disconnected();
                Err(ConnectError::Disconnected.into())
            }
            Ok(n) => {
                self.buf.extend_from_slice(&chunk[..n]);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                Ok(false)
            }
            Err(e) => {
                self.mark_disconnected();
                Err(e.into())
            }
        }
    }

    fn read_line(&mut self, deadline: Instant) -> Result<Option<String>, ClientError> {
        loop {
            if let Some(idx) = find_crlf(&self.buf[self.buf_pos..]) {
                let line_end = self.buf_pos + idx;
                let line = String::from_utf8_lossy(&self.buf[self.buf_pos..line_end]).into_owned();
                self.buf_pos = line_end + 2;
                self.compact();
                self.last_activity = Instant::now();
                return Ok(Some(line));
            }
            if !self.fill_buffer(deadline)? {
                return Ok(None);
            }
        }
    }

    fn read_payload(&mut self, n: usize, deadline: Instant) -> Result<Vec<u8>, ClientError> {
        loop {
            if self.buf.len() - self.buf_pos >= n + 2 {
                let payload = self.buf[self.buf_pos..self.buf_pos + n].to_vec();
                self.buf_pos += n + 2;
                self.compact();
                self.last_activity = Instant::now();
                return Ok(payload);
            }
            if !self.fill_buffer(deadline)? {
                return Err(TimeoutError::Read.into());
            }
        }
    }

    fn compact(&mut self) {
        if self.buf_pos > 4096 {
            self.buf.drain(0..self.buf_pos);
            self.buf_pos = 0;
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Maps a TCP connect failure per spec §6: `ETIMEDOUT`/10060 -> Timeout,
/// `ECONNREFUSED`/10061 -> Refused, everything else -> Other(os message).
fn map_connect_error(e: io::Error) -> ConnectError {
    match e.kind() {
        io::ErrorKind::TimedOut => ConnectError::Timeout,
        io::ErrorKind::ConnectionRefused => ConnectError::Refused,
        _ => ConnectError::Other(e.to_string()),
    }
}

fn build_connect_info(options: &ConnectOptions) -> ConnectInfo {
    let (user, pass, auth_token) = match &options.credentials {
        Credentials::None => (None, None, None),
        Credentials::UserPass { user, pass } => (Some(user.clone()), Some(pass.clone()), None),
        Credentials::Token(token) => (None, None, Some(token.clone())),
    };
    ConnectInfo {
        verbose: options.verbose,
        pedantic: options.pedantic,
        name: options.name.clone().unwrap_or_default(),
        lang: "rust".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol: 1,
        echo: options.echo,
        user,
        pass,
        auth_token,
        tls_required: options.tls.enabled.then_some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_crlf_locates_first_occurrence() {
        assert_eq!(find_crlf(b"PING\r\nPONG\r\n"), Some(4));
        assert_eq!(find_crlf(b"no newline here"), None);
    }
}
