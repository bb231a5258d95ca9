use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    Limits,
    Interest,
    Workqueue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    File,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardPolicy {
    Old,
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverPolicy {
    All,
    Last,
    New,
    LastPerSubject,
    ByStartSequence,
    ByStartTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckPolicy {
    None,
    All,
    Explicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPolicy {
    Instant,
    Original,
}

/// Admin-API body for creating or updating a stream. Wire field names
/// are the struct's own snake_case names; durations are seconds in this
/// type and nanoseconds on the wire (see [`seconds_as_nanos`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: String,
    pub subjects: Vec<String>,
    pub retention: RetentionPolicy,
    pub storage: StorageType,
    #[serde(default = "one")]
    pub num_replicas: u32,
    pub discard: DiscardPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_msgs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "max_age",
        with = "option_seconds_as_nanos"
    )]
    pub max_age: Option<Duration>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "duplicate_window",
        with = "option_seconds_as_nanos"
    )]
    pub duplicate_window: Option<Duration>,
    #[serde(default)]
    pub allow_direct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn one() -> u32 {
    1
}

impl StreamConfig {
    /// Defaults used by bootstrap's ensure-stream when none exists yet.
    pub fn defaults(name: impl Into<String>, subject_prefix: &str, description: impl Into<String>) -> Self {
        StreamConfig {
            name: name.into(),
            subjects: vec![format!("{subject_prefix}.>")],
            retention: RetentionPolicy::Limits,
            storage: StorageType::File,
            num_replicas: 1,
            discard: DiscardPolicy::Old,
            max_msgs: None,
            max_bytes: None,
            max_age: None,
            duplicate_window: None,
            allow_direct: false,
            description: Some(description.into()),
        }
    }
}

/// Admin-API body for creating a durable pull consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durable_name: Option<String>,
    pub deliver_policy: DeliverPolicy,
    pub ack_policy: AckPolicy,
    #[serde(default = "default_replay_policy")]
    pub replay_policy: ReplayPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_subject: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "ack_wait",
        with = "option_seconds_as_nanos"
    )]
    pub ack_wait: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_deliver: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opt_start_seq: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opt_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliver_subject: Option<String>,
}

fn default_replay_policy() -> ReplayPolicy {
    ReplayPolicy::Instant
}

impl ConsumerConfig {
    pub fn pull_durable(name: impl Into<String>, filter_subject: &str) -> Self {
        ConsumerConfig {
            durable_name: Some(name.into()),
            deliver_policy: DeliverPolicy::All,
            ack_policy: AckPolicy::Explicit,
            replay_policy: ReplayPolicy::Instant,
            filter_subject: Some(filter_subject.to_string()),
            ack_wait: None,
            max_deliver: None,
            opt_start_seq: None,
            opt_start_time: None,
            deliver_subject: None,
        }
    }
}

mod option_seconds_as_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_i64(d.as_nanos() as i64),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos: Option<i64> = Option::deserialize(deserializer)?;
        Ok(nanos.map(|n| Duration::from_nanos(n.max(0) as u64)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_config_serializes_max_age_as_nanoseconds() {
        let mut cfg = StreamConfig::defaults("S", "evt", "test stream");
        cfg.max_age = Some(Duration::from_secs(60));
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["max_age"], serde_json::json!(60_000_000_000i64));
    }

    #[test]
    fn consumer_config_omits_durable_name_when_ephemeral() {
        let cfg = ConsumerConfig {
            durable_name: None,
            ..ConsumerConfig::pull_durable("ignored", "evt.>")
        };
        let json = serde_json::to_value(&cfg).unwrap();
        assert!(json.get("durable_name").is_none());
    }
}
