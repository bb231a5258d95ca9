use crate::admin::{ConsumerInfo, StreamAdminClient, StreamInfo};
use crate::config::{ConsumerConfig, StreamConfig};
use crate::error::JetStreamError;

/// Idempotent stream provisioning: use the stream if it exists, create
/// it with sane single-node defaults otherwise. A concurrent creator
/// racing us is treated as success (see the open question on concurrent
/// `ensure-*` calls).
pub fn ensure_stream(
    admin: &mut StreamAdminClient<'_>,
    name: &str,
    subject_prefix: &str,
) -> Result<StreamInfo, JetStreamError> {
    match admin.stream_info(name) {
        Ok(info) => Ok(info),
        Err(JetStreamError::Stream(e)) if e.looks_like_not_found() => {
            let description = format!("auto-provisioned stream for {subject_prefix}");
            let config = StreamConfig::defaults(name, subject_prefix, description);
            match admin.create_stream(&config) {
                Ok(info) => Ok(info),
                Err(JetStreamError::Stream(e)) if e.looks_like_already_exists() => {
                    admin.stream_info(name)
                }
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

pub fn ensure_consumer(
    admin: &mut StreamAdminClient<'_>,
    stream: &str,
    name: &str,
    filter_subject: &str,
) -> Result<ConsumerInfo, JetStreamError> {
    match admin.consumer_info(stream, name) {
        Ok(info) => Ok(info),
        Err(JetStreamError::Stream(e)) if e.looks_like_not_found() => {
            let config = ConsumerConfig::pull_durable(name, filter_subject);
            match admin.create_consumer(stream, &config) {
                Ok(info) => Ok(info),
                Err(JetStreamError::Stream(e)) if e.looks_like_already_exists() => {
                    admin.consumer_info(stream, name)
                }
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}
