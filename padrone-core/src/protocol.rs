//! Request and response payloads exchanged with the master server.
//!
//! All property names are camelCase on the wire. Endpoints use the string
//! form from [`crate::wire`]; session ids and secrets are bare strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// HTTP method of a master server call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// Identifies a player's session on a host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSessionId(String);

impl ClientSessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ClientSessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ClientSessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Secret handed to a joining player, presented to the host on connect.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Secrets end up in logs through `{:?}`; keep the value out.
impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(***)")
    }
}

impl From<String> for ClientSecret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// External and internal endpoints of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    #[serde(with = "crate::wire::endpoint")]
    pub external: SocketAddr,
    #[serde(with = "crate::wire::endpoint")]
    pub internal: SocketAddr,
}

impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(ext:{},int:{})", self.external, self.internal)
    }
}

/// A host as listed by the master server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteHost {
    pub name: String,
    pub hosted_by: String,
    pub peer_info: PeerInfo,
    pub is_password_protected: bool,
    pub online_since: DateTime<Utc>,
    pub distance_in_km: f64,
    pub country: String,
    pub version: String,
    pub player_count: u32,
    pub max_players: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRegistrationRequest {
    pub host_name: String,
    pub peer_info: PeerInfo,
    /// `null` for hosts without a password.
    pub password: Option<String>,
    pub is_private: bool,
    pub version: String,
    pub max_players: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnregisterHostRequest {
    #[serde(with = "crate::wire::endpoint")]
    pub external_endpoint: SocketAddr,
}

/// Host heartbeat, listing the sessions currently connected to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingRequest {
    #[serde(with = "crate::wire::endpoint")]
    pub host_endpoint: SocketAddr,
    pub connected_clients: Vec<ClientSessionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(with = "crate::wire::endpoint")]
    pub host_endpoint: SocketAddr,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub session_id: ClientSessionId,
    pub secret: ClientSecret,
}

/// Sent by a host when a player disconnects from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLeaveRequest {
    #[serde(with = "crate::wire::endpoint")]
    pub host_endpoint: SocketAddr,
    pub session_id: ClientSessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub name: String,
    pub avatar_url: String,
    pub is_admin: bool,
    pub is_developer: bool,
}

/// What a host learns about a connecting session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSessionInfo {
    pub session_id: ClientSessionId,
    pub secret: ClientSecret,
    pub player_info: PlayerInfo,
}
