//! Wire encodings for network endpoints.
//!
//! An endpoint travels as a single `"address:port"` string in request bodies,
//! response bodies and query parameters alike. IPv6 addresses are written
//! without brackets, so the port is always the segment after the last colon.

use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

/// Errors decoding an endpoint from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("endpoint `{0}` has no port")]
    MissingPort(String),
    #[error("endpoint `{0}` has an invalid address")]
    InvalidAddress(String),
    #[error("endpoint `{0}` has an invalid port")]
    InvalidPort(String),
}

/// Encode an endpoint as `address:port`.
///
/// Only the address and port are carried. The scope id and flow info of an
/// IPv6 endpoint are dropped, so a scoped link-local address decodes with
/// scope id 0.
pub fn encode_endpoint(endpoint: &SocketAddr) -> String {
    format!("{}:{}", endpoint.ip(), endpoint.port())
}

/// Decode an `address:port` string.
pub fn decode_endpoint(value: &str) -> Result<SocketAddr, WireError> {
    let (address, port) = value
        .rsplit_once(':')
        .ok_or_else(|| WireError::MissingPort(value.to_string()))?;

    let ip: IpAddr = address
        .parse()
        .map_err(|_| WireError::InvalidAddress(value.to_string()))?;

    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WireError::InvalidPort(value.to_string()));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| WireError::InvalidPort(value.to_string()))?;

    Ok(SocketAddr::new(ip, port))
}

/// serde adapter: `#[serde(with = "padrone_core::wire::endpoint")]`.
pub mod endpoint {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(endpoint: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::encode_endpoint(endpoint))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::decode_endpoint(&s).map_err(serde::de::Error::custom)
    }
}
