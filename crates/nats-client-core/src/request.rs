use std::collections::HashMap;
use std::time::Instant;

use rand::Rng;

use crate::message::Message;

struct PendingRequest {
    deadline: Instant,
    reply: Option<Message>,
}

/// Correlates outstanding `request` calls with their replies, keyed by
/// the full inbox subject minted for that request.
#[derive(Default)]
pub struct PendingRequestTable {
    slots: HashMap<String, PendingRequest>,
}

impl PendingRequestTable {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Mint a fresh, unpredictable reply subject under `inbox_prefix` and
    /// register a waiting slot for it.
    pub fn register(&mut self, inbox_prefix: &str, deadline: Instant) -> String {
        let subject = format!("{inbox_prefix}.{}", random_token());
        self.slots.insert(
            subject.clone(),
            PendingRequest {
                deadline,
                reply: None,
            },
        );
        subject
    }

    /// Called by the dispatcher when a message arrives on an inbox
    /// subject. Returns `true` if it was claimed by a waiting request;
    /// `false` means there's no such slot, or it already holds an
    /// earlier reply -- the first reply for a token wins, and later
    /// ones for the same token are dropped silently.
    pub fn fulfil(&mut self, subject: &str, message: Message) -> bool {
        match self.slots.get_mut(subject) {
            Some(slot) if slot.reply.is_none() => {
                slot.reply = Some(message);
                true
            }
            _ => false,
        }
    }

    pub fn is_inbox_subject(&self, inbox_prefix: &str, subject: &str) -> bool {
        subject
            .strip_prefix(inbox_prefix)
            .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Take the reply for `subject` if it has arrived, dropping the slot
    /// either way if it has arrived or its deadline has passed.
    pub fn poll(&mut self, subject: &str, now: Instant) -> Option<PollOutcome> {
        let slot = self.slots.get(subject)?;
        if slot.reply.is_some() {
            let slot = self.slots.remove(subject).unwrap();
            return Some(PollOutcome::Ready(slot.reply.unwrap()));
        }
        if now >= slot.deadline {
            self.slots.remove(subject);
            return Some(PollOutcome::Expired);
        }
        None
    }

    pub fn remove(&mut self, subject: &str) {
        self.slots.remove(subject);
    }

    /// Drop every pending slot. Used when the session closes -- any
    /// caller still waiting on one discovers this via `ensure_ready`
    /// failing on its next pump tick, not via a reply ever arriving.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

pub enum PollOutcome {
    Ready(Message),
    Expired,
}

fn random_token() -> String {
    let mut rng = rand::thread_rng();
    (0..22)
        .map(|_| {
            let n: u8 = rng.gen_range(0..36);
            std::char::from_digit(n as u32, 36).unwrap()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_tokens_are_unlikely_to_collide() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(random_token()));
        }
    }

    #[test]
    fn inbox_subject_detection_requires_dot_boundary() {
        let table = PendingRequestTable::new();
        assert!(table.is_inbox_subject("_INBOX.abc", "_INBOX.abc.reply1"));
        assert!(!table.is_inbox_subject("_INBOX.abc", "_INBOX.abcdef"));
    }
}
