//! Core types for the Padrone master server client.
//!
//! This crate holds the parts that do not depend on a transport: the wire
//! protocol, endpoint encoding, authentication tokens and error types.

pub mod auth;
pub mod error;
pub mod protocol;
pub mod wire;

pub use auth::{AuthScheme, AuthToken, Credentials};
pub use error::{ClientError, ClientResult, ErrorCategory};
pub use protocol::{ClientSecret, ClientSessionId, HttpMethod, PeerInfo};
