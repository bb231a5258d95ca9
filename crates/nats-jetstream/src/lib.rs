//! nats-jetstream: the stream/consumer control plane built over
//! `nats-client-core`'s request/reply. Provisions streams and durable
//! pull consumers and drives the pull-fetch + ack protocol.

pub mod ack;
pub mod admin;
pub mod bootstrap;
pub mod config;
pub mod consumer;
pub mod error;

pub use ack::{parse_ack_subject, resolve_coordinates, AckKind, AckSubject};
pub use admin::{ConsumerInfo, StreamAdminClient, StreamInfo};
pub use bootstrap::{ensure_consumer, ensure_stream};
pub use config::{
    AckPolicy, ConsumerConfig, DeliverPolicy, DiscardPolicy, ReplayPolicy, RetentionPolicy,
    StorageType, StreamConfig,
};
pub use consumer::{ack, fetch_next, ConsumedMessage, FetchOutcome};
pub use error::{JetStreamError, StreamError};
