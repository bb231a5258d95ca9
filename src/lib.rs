//! nats-client-rs: a client library for a text-line-framed pub/sub
//! broker and its durable stream/consumer extension.
//!
//! This crate is a thin facade over three building blocks that can also
//! be depended on directly: [`nats_protocol`] (the wire codec),
//! [`nats_client_core`] (the session, subscriptions, request/reply), and
//! [`nats_jetstream`] (stream/consumer provisioning and the pull-fetch +
//! ack protocol).

pub use nats_client_core::{
    ClientError, ConnectError, ConnectOptions, ConnectOptionsBuilder, Credentials, Message,
    SerializationError, Session, SessionState, SubjectError, TimeoutError, TlsOptions, Transport,
};
pub use nats_jetstream::{
    ack, fetch_next, AckKind, AckPolicy, ConsumedMessage, ConsumerConfig, DeliverPolicy,
    DiscardPolicy, ensure_consumer, ensure_stream, FetchOutcome, JetStreamError, ReplayPolicy,
    RetentionPolicy, StorageType, StreamAdminClient, StreamConfig, StreamError,
};
pub use nats_protocol::Headers;
