use std::time::Duration;

use nats_client_core::{ClientError, Message, Session, TimeoutError};

use crate::ack::{resolve_coordinates, AckKind};
use crate::admin::StreamAdminClient;
use crate::error::{JetStreamError, StreamError};

/// A message pulled off a consumer, with its delivery coordinates
/// already decoded from the ack subject (or overriding headers).
pub struct ConsumedMessage {
    pub message: Message,
    pub stream: String,
    pub consumer: String,
    pub delivered: u64,
    pub stream_seq: u64,
    pub consumer_seq: u64,
}

pub enum FetchOutcome {
    Message(ConsumedMessage),
    Empty,
}

/// Fetch the next message from a pull consumer. With `no_wait`, an empty
/// consumer yields `FetchOutcome::Empty` instead of failing; without it,
/// an empty consumer surfaces as `TimeoutError::Request`.
pub fn fetch_next(
    admin: &mut StreamAdminClient<'_>,
    stream: &str,
    consumer: &str,
    no_wait: bool,
    timeout: Duration,
) -> Result<FetchOutcome, JetStreamError> {
    let message = match admin.next_message(stream, consumer, no_wait, timeout) {
        Ok(message) => message,
        Err(JetStreamError::Client(ClientError::Timeout(_))) if no_wait => {
            return Ok(FetchOutcome::Empty)
        }
        Err(e) => return Err(e),
    };

    if message.status() == Some("404") {
        return if no_wait {
            Ok(FetchOutcome::Empty)
        } else {
            Err(ClientError::Timeout(TimeoutError::Request).into())
        };
    }

    let reply_to = message.reply_to.clone().ok_or_else(|| StreamError::ApiFailure {
        code: 0,
        description: "consumed message carried no ack subject".into(),
    })?;
    let coords = resolve_coordinates(&reply_to, message.headers.as_ref()).ok_or_else(|| {
        StreamError::ApiFailure {
            code: 0,
            description: format!("unparsable ack subject: {reply_to}"),
        }
    })?;

    tracing::debug!(
        stream = %coords.stream,
        consumer = %coords.consumer,
        stream_seq = coords.stream_seq,
        "fetched message from pull consumer"
    );

    Ok(FetchOutcome::Message(ConsumedMessage {
        stream: coords.stream,
        consumer: coords.consumer,
        delivered: coords.delivered,
        stream_seq: coords.stream_seq,
        consumer_seq: coords.consumer_seq,
        message,
    }))
}

/// Publish an acknowledgment for a previously fetched message. Ack
/// publishes are fire-and-forget; no reply is awaited.
pub fn ack(session: &mut Session, consumed: &ConsumedMessage, kind: AckKind) -> Result<(), ClientError> {
    let reply_to = consumed
        .message
        .reply_to
        .as_deref()
        .expect("a ConsumedMessage always carries an ack subject");
    tracing::debug!(reply_to, stream = %consumed.stream, consumer = %consumed.consumer, "acking message");
    session.publish(reply_to, &kind.payload())
}
