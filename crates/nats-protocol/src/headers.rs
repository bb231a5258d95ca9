use crate::error::ProtocolError;

const VERSION_LINE: &str = "NATS/1.0";

/// An ordered list of header key/value pairs.
///
/// Kept as a `Vec` rather than a map: the wire format allows repeated keys
/// and preserves the order they were written in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(pub Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Headers(Vec::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode as the `NATS/1.0\r\nKey: Value\r\n...\r\n\r\n` block, including
    /// the trailing blank line. The returned length is the `<hdr-size>`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(VERSION_LINE.as_bytes());
        out.extend_from_slice(b"\r\n");
        for (k, v) in &self.0 {
            out.extend_from_slice(k.trim().as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(v.trim().as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out
    }

    /// Parse a header block of exactly `hdr_size` bytes (version line, zero
    /// or more `Key: Value` lines, then the blank-line terminator).
    pub fn parse(block: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(block)
            .map_err(|_| ProtocolError::malformed(block))?;
        let mut lines = text.split("\r\n");
        let version = lines.next().ok_or_else(|| ProtocolError::malformed(block))?;
        if version != VERSION_LINE {
            return Err(ProtocolError::malformed(block));
        }
        let mut headers = Headers::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let Some(idx) = line.find(':') else {
                return Err(ProtocolError::malformed(block));
            };
            let key = line[..idx].trim().to_string();
            let value = line[idx + 1..].trim().to_string();
            headers.insert(key, value);
        }
        Ok(headers)
    }
}
