use std::time::Duration;

use nats_client_core::{Message, SerializationError, Session};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{ConsumerConfig, StreamConfig};
use crate::error::{JetStreamError, StreamError};

/// The stream layer's admin-info responses are passed through as-is --
/// their schema is server-defined and only the `error` envelope is a
/// contract this client relies on.
pub type StreamInfo = serde_json::Value;
pub type ConsumerInfo = serde_json::Value;

/// Request/reply client for the `$JS.API.*` (or `$JS.<domain>.API.*`)
/// administrative subjects. Holds a non-owning handle to the `Session`
/// it was built from.
pub struct StreamAdminClient<'a> {
    session: &'a mut Session,
    domain: Option<String>,
    request_timeout: Duration,
}

impl<'a> StreamAdminClient<'a> {
    pub fn new(session: &'a mut Session, domain: Option<String>) -> Self {
        Self {
            session,
            domain,
            request_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn api_subject(&self, suffix: &str) -> String {
        match &self.domain {
            Some(domain) => format!("$JS.{domain}.API.{suffix}"),
            None => format!("$JS.API.{suffix}"),
        }
    }

    /// Every admin/consumer call must refuse to talk to a server that
    /// never advertised the stream layer, per §7's `StreamError::NotAvailable`.
    fn ensure_stream_layer(&self) -> Result<(), JetStreamError> {
        if self.session.capabilities().stream_layer_enabled() {
            Ok(())
        } else {
            Err(StreamError::NotAvailable.into())
        }
    }

    fn call<Req: Serialize, Resp: DeserializeOwned>(
        &mut self,
        suffix: &str,
        body: &Req,
    ) -> Result<Resp, JetStreamError> {
        self.ensure_stream_layer()?;
        let payload = serde_json::to_vec(body).map_err(|e| SerializationError(e.to_string()))?;
        let subject = self.api_subject(suffix);
        let reply = self.session.request(&subject, &payload, self.request_timeout)?;
        decode_response(&reply.payload)
    }

    fn call_empty<Resp: DeserializeOwned>(&mut self, suffix: &str) -> Result<Resp, JetStreamError> {
        self.ensure_stream_layer()?;
        let reply = self
            .session
            .request(&self.api_subject(suffix), b"{}", self.request_timeout)?;
        decode_response(&reply.payload)
    }

    pub fn create_stream(&mut self, config: &StreamConfig) -> Result<StreamInfo, JetStreamError> {
        self.call(&format!("STREAM.CREATE.{}", config.name), config)
    }

    pub fn update_stream(&mut self, config: &StreamConfig) -> Result<StreamInfo, JetStreamError> {
        self.call(&format!("STREAM.UPDATE.{}", config.name), config)
    }

    pub fn stream_info(&mut self, name: &str) -> Result<StreamInfo, JetStreamError> {
        self.call_empty(&format!("STREAM.INFO.{name}"))
    }

    pub fn delete_stream(&mut self, name: &str) -> Result<(), JetStreamError> {
        let _: serde_json::Value = self.call_empty(&format!("STREAM.DELETE.{name}"))?;
        Ok(())
    }

    pub fn purge_stream(&mut self, name: &str) -> Result<(), JetStreamError> {
        let _: serde_json::Value = self.call_empty(&format!("STREAM.PURGE.{name}"))?;
        Ok(())
    }

    pub fn get_message(&mut self, name: &str, seq: u64) -> Result<serde_json::Value, JetStreamError> {
        self.call(&format!("STREAM.MSG.GET.{name}"), &SeqBody { seq })
    }

    pub fn delete_message(&mut self, name: &str, seq: u64) -> Result<(), JetStreamError> {
        let _: serde_json::Value = self.call(&format!("STREAM.MSG.DELETE.{name}"), &SeqBody { seq })?;
        Ok(())
    }

    pub fn list_streams(&mut self) -> Result<serde_json::Value, JetStreamError> {
        self.call_empty("STREAM.LIST")
    }

    pub fn create_consumer(
        &mut self,
        stream: &str,
        config: &ConsumerConfig,
    ) -> Result<ConsumerInfo, JetStreamError> {
        let name = config.durable_name.clone().unwrap_or_default();
        self.call(
            &format!("CONSUMER.DURABLE.CREATE.{stream}.{name}"),
            &ConsumerCreateBody {
                stream_name: stream.to_string(),
                config: config.clone(),
            },
        )
    }

    pub fn consumer_info(&mut self, stream: &str, name: &str) -> Result<ConsumerInfo, JetStreamError> {
        self.call_empty(&format!("CONSUMER.INFO.{stream}.{name}"))
    }

    pub fn delete_consumer(&mut self, stream: &str, name: &str) -> Result<(), JetStreamError> {
        let _: serde_json::Value = self.call_empty(&format!("CONSUMER.DELETE.{stream}.{name}"))?;
        Ok(())
    }

    pub fn list_consumers(&mut self, stream: &str, offset: u64) -> Result<serde_json::Value, JetStreamError> {
        self.call(&format!("CONSUMER.LIST.{stream}"), &OffsetBody { offset })
    }

    /// Raw pull-fetch used by [`crate::consumer::fetch_next`]. Returns
    /// the underlying client error untouched so the caller can
    /// distinguish a hard timeout from a decoded status response.
    pub(crate) fn next_message(
        &mut self,
        stream: &str,
        consumer: &str,
        no_wait: bool,
        timeout: Duration,
    ) -> Result<Message, JetStreamError> {
        self.ensure_stream_layer()?;
        let body = NextMsgBody {
            batch: 1,
            no_wait: no_wait.then_some(true),
        };
        let payload = serde_json::to_vec(&body).expect("NextMsgBody always serializes");
        let subject = self.api_subject(&format!("CONSUMER.MSG.NEXT.{stream}.{consumer}"));
        self.session
            .request(&subject, &payload, timeout)
            .map_err(JetStreamError::from)
    }
}

#[derive(Serialize)]
struct SeqBody {
    seq: u64,
}

#[derive(Serialize)]
struct OffsetBody {
    offset: u64,
}

#[derive(Serialize)]
struct NextMsgBody {
    batch: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    no_wait: Option<bool>,
}

#[derive(Serialize)]
struct ConsumerCreateBody {
    stream_name: String,
    config: ConsumerConfig,
}

fn decode_response<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, JetStreamError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| SerializationError(e.to_string()))?;
    if let Some(error) = value.get("error") {
        let code = error.get("code").and_then(serde_json::Value::as_i64).unwrap_or(0);
        let description = error
            .get("description")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(StreamError::ApiFailure { code, description }.into());
    }
    serde_json::from_value(value).map_err(|e| SerializationError(e.to_string()).into())
}
