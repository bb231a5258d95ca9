//! nats-client-core: the connection, subscription registry, and
//! request/reply correlator built on top of `nats-protocol`'s wire
//! codec. A single `Session` is meant to be driven from one thread via
//! [`Session::process`]; there is no hidden background I/O.

pub mod config;
pub mod error;
pub mod message;
pub mod request;
pub mod session;
pub mod subject;
pub mod subscription;

pub use config::{ConnectOptions, ConnectOptionsBuilder, Credentials, ServerCapabilities, TlsOptions};
pub use error::{ClientError, ConnectError, SerializationError, SubjectError, TimeoutError};
pub use message::Message;
pub use session::{Session, SessionState, Transport};
pub use subject::{validate_publish, validate_subscribe};
