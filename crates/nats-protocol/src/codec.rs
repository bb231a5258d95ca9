//! Line-framed control protocol: parsing of inbound lines and emission of
//! outbound frames. See `Session` (in `nats-client-core`) for the I/O loop
//! that drives this codec against a live socket.

use crate::connect::ConnectInfo;
use crate::error::ProtocolError;
use crate::headers::Headers;

pub const CRLF: &[u8] = b"\r\n";

/// Cheap prefix classification of an inbound control line, ahead of the
/// kind-specific parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Info,
    Msg,
    Hmsg,
    Ping,
    Pong,
    Ok,
    Err,
}

/// Detect which parser a raw inbound line (without its trailing CRLF)
/// should be routed to.
pub fn detect_kind(line: &[u8]) -> Result<LineKind, ProtocolError> {
    let upper_prefix = |n: usize| -> Vec<u8> {
        line.iter().take(n).map(u8::to_ascii_uppercase).collect()
    };
    if line.len() >= 4 && upper_prefix(4) == b"INFO" {
        return Ok(LineKind::Info);
    }
    if line.len() >= 5 && upper_prefix(5) == b"HMSG " {
        return Ok(LineKind::Hmsg);
    }
    if line.len() >= 4 && upper_prefix(4) == b"MSG " {
        return Ok(LineKind::Msg);
    }
    if line.len() >= 4 && upper_prefix(4) == b"PING" {
        return Ok(LineKind::Ping);
    }
    if line.len() >= 4 && upper_prefix(4) == b"PONG" {
        return Ok(LineKind::Pong);
    }
    if line.len() >= 3 && upper_prefix(3) == b"+OK" {
        return Ok(LineKind::Ok);
    }
    if line.len() >= 4 && upper_prefix(4) == b"-ERR" {
        return Ok(LineKind::Err);
    }
    Err(ProtocolError::malformed(line))
}

/// Parsed `MSG`/`HMSG` header line (everything up to, but not including,
/// the payload bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgHeaderLine {
    pub subject: String,
    pub sid: String,
    pub reply_to: Option<String>,
    /// `Some(n)` for `HMSG`: the length of the header block prefix of the
    /// payload. `None` for plain `MSG`.
    pub hdr_len: Option<usize>,
    /// Total number of payload bytes to read after this line (for `HMSG`
    /// this includes the header block).
    pub total_len: usize,
}

fn str_field(line: &str) -> Result<&str, ProtocolError> {
    if line.is_empty() {
        Err(ProtocolError::malformed(line.as_bytes()))
    } else {
        Ok(line)
    }
}

pub fn parse_info(line: &str) -> Result<String, ProtocolError> {
    let rest = line
        .get(4..)
        .ok_or_else(|| ProtocolError::malformed(line.as_bytes()))?
        .trim();
    Ok(rest.to_string())
}

pub fn parse_msg(line: &str) -> Result<MsgHeaderLine, ProtocolError> {
    parse_msg_like(line, 4, false)
}

pub fn parse_hmsg(line: &str) -> Result<MsgHeaderLine, ProtocolError> {
    parse_msg_like(line, 5, true)
}

fn parse_msg_like(line: &str, skip: usize, headered: bool) -> Result<MsgHeaderLine, ProtocolError> {
    let rest = line
        .get(skip..)
        .ok_or_else(|| ProtocolError::malformed(line.as_bytes()))?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let malformed = || ProtocolError::malformed(line.as_bytes());

    if headered {
        // subject sid [reply] hdr-size total-size
        match fields.len() {
            4 => Ok(MsgHeaderLine {
                subject: str_field(fields[0])?.to_string(),
                sid: str_field(fields[1])?.to_string(),
                reply_to: None,
                hdr_len: Some(fields[2].parse().map_err(|_| malformed())?),
                total_len: fields[3].parse().map_err(|_| malformed())?,
            }),
            5 => Ok(MsgHeaderLine {
                subject: str_field(fields[0])?.to_string(),
                sid: str_field(fields[1])?.to_string(),
                reply_to: Some(fields[2].to_string()),
                hdr_len: Some(fields[3].parse().map_err(|_| malformed())?),
                total_len: fields[4].parse().map_err(|_| malformed())?,
            }),
            _ => Err(malformed()),
        }
    } else {
        // subject sid [reply] size
        match fields.len() {
            3 => Ok(MsgHeaderLine {
                subject: str_field(fields[0])?.to_string(),
                sid: str_field(fields[1])?.to_string(),
                reply_to: None,
                hdr_len: None,
                total_len: fields[2].parse().map_err(|_| malformed())?,
            }),
            4 => Ok(MsgHeaderLine {
                subject: str_field(fields[0])?.to_string(),
                sid: str_field(fields[1])?.to_string(),
                reply_to: Some(fields[2].to_string()),
                hdr_len: None,
                total_len: fields[3].parse().map_err(|_| malformed())?,
            }),
            _ => Err(malformed()),
        }
    }
}

/// Extract the quoted reason from a `-ERR '<reason>'` line.
pub fn parse_err(line: &str) -> Result<String, ProtocolError> {
    let rest = line
        .get(4..)
        .ok_or_else(|| ProtocolError::malformed(line.as_bytes()))?
        .trim();
    let trimmed = rest.trim_matches('\'');
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Outbound frame emission
// ---------------------------------------------------------------------------

pub fn encode_connect(info: &ConnectInfo) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"CONNECT ");
    out.extend_from_slice(info.to_json().as_bytes());
    out.extend_from_slice(CRLF);
    out
}

pub fn encode_ping() -> Vec<u8> {
    b"PING\r\n".to_vec()
}

pub fn encode_pong() -> Vec<u8> {
    b"PONG\r\n".to_vec()
}

pub fn encode_pub(subject: &str, reply_to: Option<&str>, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"PUB ");
    out.extend_from_slice(subject.as_bytes());
    out.push(b' ');
    if let Some(reply) = reply_to {
        out.extend_from_slice(reply.as_bytes());
        out.push(b' ');
    }
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.extend_from_slice(CRLF);
    out.extend_from_slice(payload);
    out.extend_from_slice(CRLF);
    out
}

pub fn encode_hpub(
    subject: &str,
    reply_to: Option<&str>,
    headers: &Headers,
    payload: &[u8],
) -> Vec<u8> {
    let hdr_block = headers.encode();
    let total_len = hdr_block.len() + payload.len();
    let mut out = Vec::new();
    out.extend_from_slice(b"HPUB ");
    out.extend_from_slice(subject.as_bytes());
    out.push(b' ');
    if let Some(reply) = reply_to {
        out.extend_from_slice(reply.as_bytes());
        out.push(b' ');
    }
    out.extend_from_slice(hdr_block.len().to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(total_len.to_string().as_bytes());
    out.extend_from_slice(CRLF);
    out.extend_from_slice(&hdr_block);
    out.extend_from_slice(payload);
    out.extend_from_slice(CRLF);
    out
}

pub fn encode_sub(subject: &str, queue_group: Option<&str>, sid: u64) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"SUB ");
    out.extend_from_slice(subject.as_bytes());
    out.push(b' ');
    if let Some(queue) = queue_group {
        out.extend_from_slice(queue.as_bytes());
        out.push(b' ');
    }
    out.extend_from_slice(sid.to_string().as_bytes());
    out.extend_from_slice(CRLF);
    out
}

pub fn encode_unsub(sid: u64, max_msgs: Option<u64>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"UNSUB ");
    out.extend_from_slice(sid.to_string().as_bytes());
    if let Some(max) = max_msgs {
        out.push(b' ');
        out.extend_from_slice(max.to_string().as_bytes());
    }
    out.extend_from_slice(CRLF);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_line_kind() {
        assert_eq!(detect_kind(b"INFO {}").unwrap(), LineKind::Info);
        assert_eq!(detect_kind(b"MSG foo 1 3").unwrap(), LineKind::Msg);
        assert_eq!(detect_kind(b"HMSG foo 1 10 13").unwrap(), LineKind::Hmsg);
        assert_eq!(detect_kind(b"PING").unwrap(), LineKind::Ping);
        assert_eq!(detect_kind(b"PONG").unwrap(), LineKind::Pong);
        assert_eq!(detect_kind(b"+OK").unwrap(), LineKind::Ok);
        assert_eq!(detect_kind(b"-ERR 'bad'").unwrap(), LineKind::Err);
    }

    #[test]
    fn rejects_unrecognized_line() {
        assert!(detect_kind(b"GARBAGE").is_err());
    }

    #[test]
    fn parses_msg_without_reply() {
        let m = parse_msg("MSG orders.new 1 9").unwrap();
        assert_eq!(m.subject, "orders.new");
        assert_eq!(m.sid, "1");
        assert_eq!(m.reply_to, None);
        assert_eq!(m.total_len, 9);
        assert_eq!(m.hdr_len, None);
    }

    #[test]
    fn parses_msg_with_reply() {
        let m = parse_msg("MSG orders.new 1 _INBOX.abc 9").unwrap();
        assert_eq!(m.reply_to.as_deref(), Some("_INBOX.abc"));
        assert_eq!(m.total_len, 9);
    }

    #[test]
    fn parses_hmsg_with_and_without_reply() {
        let m = parse_hmsg("HMSG orders.new 1 10 19").unwrap();
        assert_eq!(m.hdr_len, Some(10));
        assert_eq!(m.total_len, 19);
        assert_eq!(m.reply_to, None);

        let m2 = parse_hmsg("HMSG orders.new 1 r 10 19").unwrap();
        assert_eq!(m2.reply_to.as_deref(), Some("r"));
    }

    #[test]
    fn parses_err_reason_stripping_quotes() {
        assert_eq!(
            parse_err("-ERR 'Authorization Violation'").unwrap(),
            "Authorization Violation"
        );
    }

    #[test]
    fn emits_pub_with_correct_announced_size() {
        let frame = encode_pub("orders.new", None, b"{\"id\":1}");
        assert_eq!(frame, b"PUB orders.new 8\r\n{\"id\":1}\r\n");
    }

    #[test]
    fn emits_pub_with_reply_to() {
        let frame = encode_pub("echo", Some("_INBOX.x.y"), b"hi");
        assert_eq!(frame, b"PUB echo _INBOX.x.y 2\r\nhi\r\n");
    }

    #[test]
    fn emits_hpub_with_combined_header_and_payload_size() {
        let mut h = Headers::new();
        h.insert("Nats-Stream", "S");
        let frame = encode_hpub("orders.new", None, &h, b"hi");
        let text = String::from_utf8(frame.clone()).unwrap();
        let first_line = text.split("\r\n").next().unwrap();
        assert!(first_line.starts_with("HPUB orders.new "));
        // payload immediately follows the header block and ends with CRLF
        assert!(text.ends_with("hi\r\n"));
    }

    #[test]
    fn emits_sub_and_unsub() {
        assert_eq!(encode_sub("foo", None, 1), b"SUB foo 1\r\n");
        assert_eq!(encode_sub("foo", Some("workers"), 2), b"SUB foo workers 2\r\n");
        assert_eq!(encode_unsub(1, None), b"UNSUB 1\r\n");
        assert_eq!(encode_unsub(1, Some(5)), b"UNSUB 1 5\r\n");
    }
}
