use nats_protocol::Headers;

/// A message delivered to a subscription, or carried as a request's reply.
#[derive(Debug, Clone)]
pub struct Message {
    pub subject: String,
    pub reply_to: Option<String>,
    pub headers: Option<Headers>,
    pub payload: Vec<u8>,
    pub(crate) sid: u64,
}

impl Message {
    pub fn status(&self) -> Option<&str> {
        self.headers.as_ref().and_then(|h| h.get("Status"))
    }
}
