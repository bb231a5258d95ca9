use nats_protocol::Headers;

/// Coordinates recovered from a consumed message's ack subject (or, when
/// present, from the `Nats-Stream`/`Nats-Sequence` headers which take
/// precedence over the token-based parse).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckSubject {
    pub stream: String,
    pub consumer: String,
    pub delivered: u64,
    pub stream_seq: u64,
    pub consumer_seq: u64,
}

/// Parse either the 9-token `$JS.ACK.<stream>.<consumer>.<delivered>.<sseq>.<cseq>.<ts>.<pending>`
/// shape or the >=12-token `$JS.ACK.<domain>.<account>.<stream>.<consumer>.<delivered>.<sseq>.<cseq>.<ts>.<pending>.<token>`
/// shape (with a domain/account prefix).
pub fn parse_ack_subject(subject: &str) -> Option<AckSubject> {
    let tokens: Vec<&str> = subject.split('.').collect();
    if tokens.first() != Some(&"$JS") || tokens.get(1) != Some(&"ACK") {
        return None;
    }
    match tokens.len() {
        9 => Some(AckSubject {
            stream: tokens[2].to_string(),
            consumer: tokens[3].to_string(),
            delivered: tokens[4].parse().ok()?,
            stream_seq: tokens[5].parse().ok()?,
            consumer_seq: tokens[6].parse().ok()?,
        }),
        n if n >= 12 => Some(AckSubject {
            stream: tokens[4].to_string(),
            consumer: tokens[5].to_string(),
            delivered: tokens[6].parse().ok()?,
            stream_seq: tokens[7].parse().ok()?,
            consumer_seq: tokens[8].parse().ok()?,
        }),
        _ => None,
    }
}

/// Headers, when present on the delivered message, take precedence over
/// the token parse of the ack subject.
pub fn resolve_coordinates(subject: &str, headers: Option<&Headers>) -> Option<AckSubject> {
    let mut parsed = parse_ack_subject(subject)?;
    if let Some(headers) = headers {
        if let Some(stream) = headers.get("Nats-Stream") {
            parsed.stream = stream.to_string();
        }
        if let Some(seq) = headers.get("Nats-Sequence") {
            if let Ok(seq) = seq.parse() {
                parsed.stream_seq = seq;
            }
        }
    }
    Some(parsed)
}

/// An acknowledgment outcome a consumer can publish to the ack subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    Ack,
    Nak,
    NakWithDelay(std::time::Duration),
    Term,
    InProgress,
}

impl AckKind {
    pub fn payload(self) -> Vec<u8> {
        match self {
            AckKind::Ack => b"+ACK".to_vec(),
            AckKind::Nak => b"-NAK".to_vec(),
            AckKind::NakWithDelay(delay) => {
                format!("{{\"delay\":{}}}", delay.as_nanos()).into_bytes()
            }
            AckKind::Term => b"+TERM".to_vec(),
            AckKind::InProgress => b"+WPI".to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nine_token_ack_subject() {
        let parsed = parse_ack_subject("$JS.ACK.S.C.1.42.7.1700000000.0").unwrap();
        assert_eq!(parsed.stream, "S");
        assert_eq!(parsed.consumer, "C");
        assert_eq!(parsed.delivered, 1);
        assert_eq!(parsed.stream_seq, 42);
        assert_eq!(parsed.consumer_seq, 7);
    }

    #[test]
    fn parses_domain_qualified_ack_subject() {
        let parsed =
            parse_ack_subject("$JS.ACK.hub.acct.S.C.1.42.7.1700000000.0.tok").unwrap();
        assert_eq!(parsed.stream, "S");
        assert_eq!(parsed.consumer, "C");
        assert_eq!(parsed.stream_seq, 42);
        assert_eq!(parsed.consumer_seq, 7);
    }

    #[test]
    fn rejects_non_ack_subjects() {
        assert!(parse_ack_subject("orders.new").is_none());
    }

    #[test]
    fn headers_override_token_parse() {
        let mut headers = Headers::new();
        headers.insert("Nats-Stream", "OVERRIDE");
        headers.insert("Nats-Sequence", "999");
        let resolved =
            resolve_coordinates("$JS.ACK.S.C.1.42.7.1700000000.0", Some(&headers)).unwrap();
        assert_eq!(resolved.stream, "OVERRIDE");
        assert_eq!(resolved.stream_seq, 999);
    }

    #[test]
    fn ack_kinds_encode_to_literal_payloads() {
        assert_eq!(AckKind::Ack.payload(), b"+ACK");
        assert_eq!(AckKind::Nak.payload(), b"-NAK");
        assert_eq!(AckKind::Term.payload(), b"+TERM");
        assert_eq!(AckKind::InProgress.payload(), b"+WPI");
        assert_eq!(
            AckKind::NakWithDelay(std::time::Duration::from_secs(1)).payload(),
            b"{\"delay\":1000000000}"
        );
    }
}
