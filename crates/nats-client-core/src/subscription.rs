use std::collections::HashMap;

use crate::message::Message;

/// Delivery destination for an inbound message: either a user callback or
/// a bounded mailbox drained by `next_msg`-style polling callers.
pub enum Delivery {
    Callback(Box<dyn FnMut(Message) + Send>),
    Mailbox(Vec<Message>),
}

pub struct Subscription {
    pub subject: String,
    pub queue_group: Option<String>,
    pub remaining: Option<u64>,
    pub delivery: Delivery,
}

/// Tracks active subscriptions by `sid` and hands out new ones from a
/// strictly increasing counter, matching the allocation order `SUB`
/// frames were sent in.
#[derive(Default)]
pub struct SubscriptionRegistry {
    next_sid: u64,
    subs: HashMap<u64, Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            next_sid: 1,
            subs: HashMap::new(),
        }
    }

    pub fn allocate_sid(&mut self) -> u64 {
        let sid = self.next_sid;
        self.next_sid += 1;
        sid
    }

    pub fn insert(&mut self, sid: u64, sub: Subscription) {
        self.subs.insert(sid, sub);
    }

    pub fn get_mut(&mut self, sid: u64) -> Option<&mut Subscription> {
        self.subs.get_mut(&sid)
    }

    pub fn remove(&mut self, sid: u64) -> Option<Subscription> {
        self.subs.remove(&sid)
    }

    pub fn contains(&self, sid: u64) -> bool {
        self.subs.contains_key(&sid)
    }

    /// Drop every subscription. Used when the session closes; the
    /// server-side state is discarded along with the socket, so there is
    /// nothing left to `UNSUB`.
    pub fn clear(&mut self) {
        self.subs.clear();
    }

    /// Decrement the auto-unsubscribe counter for `sid` after a delivery.
    /// Returns `true` if the subscription has now reached its limit and
    /// should be torn down.
    pub fn note_delivered(&mut self, sid: u64) -> bool {
        let Some(sub) = self.subs.get_mut(&sid) else {
            return false;
        };
        match &mut sub.remaining {
            None => false,
            Some(n) => {
                *n = n.saturating_sub(1);
                *n == 0
            }
        }
    }
}
