//! nats-protocol: the line-framed wire format shared by client and broker.
//!
//! Covers frame detection/parsing, header-block encode/decode, the `INFO`
//! capability blob, and the `CONNECT` handshake body. Owns no socket and no
//! session state -- see `nats-client-core` for the session built on top.

pub mod codec;
pub mod connect;
pub mod error;
pub mod headers;
pub mod info;

pub use codec::{LineKind, MsgHeaderLine};
pub use connect::ConnectInfo;
pub use error::ProtocolError;
pub use headers::Headers;
pub use info::ServerInfo;
