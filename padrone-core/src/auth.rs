//! Authentication tokens for master server calls.
//!
//! Every request carries an `X-Padrone-Auth` header holding
//! `base64(method ":" credentials)`. The encoded form is computed once when
//! the token is built.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;

/// The provider-specific ways a player or operator can authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    /// Server operator login.
    Admin,
    /// Steam session ticket.
    Steam,
    /// itch.io download key.
    ItchDownloadKey,
    /// itch.io API key.
    ItchApiKey,
    /// Oculus user id plus nonce.
    Oculus,
}

impl AuthScheme {
    /// The method label sent in front of the credentials.
    pub fn label(&self) -> &'static str {
        match self {
            AuthScheme::Admin => "admin",
            AuthScheme::Steam => "steam",
            AuthScheme::ItchDownloadKey => "itch.downloadkey",
            AuthScheme::ItchApiKey => "itch.apikey",
            AuthScheme::Oculus => "oculus",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scheme-specific inputs for [`AuthToken::build`].
#[derive(Debug, Clone, Copy)]
pub enum Credentials<'a> {
    Admin { username: &'a str, password: &'a str },
    /// `ticket_len` is the number of meaningful bytes; the buffer may be larger.
    Steam { ticket: &'a [u8], ticket_len: usize },
    ItchDownloadKey(&'a str),
    ItchApiKey(&'a str),
    Oculus { user_id: &'a str, nonce: &'a str },
}

impl Credentials<'_> {
    /// The scheme these credentials belong to.
    pub fn scheme(&self) -> AuthScheme {
        match self {
            Credentials::Admin { .. } => AuthScheme::Admin,
            Credentials::Steam { .. } => AuthScheme::Steam,
            Credentials::ItchDownloadKey(_) => AuthScheme::ItchDownloadKey,
            Credentials::ItchApiKey(_) => AuthScheme::ItchApiKey,
            Credentials::Oculus { .. } => AuthScheme::Oculus,
        }
    }

    fn join(&self) -> String {
        match *self {
            Credentials::Admin { username, password } => format!("{},{}", username, password),
            Credentials::Steam { ticket, ticket_len } => {
                hex::encode_upper(&ticket[..ticket_len.min(ticket.len())])
            }
            Credentials::ItchDownloadKey(key) | Credentials::ItchApiKey(key) => key.to_string(),
            Credentials::Oculus { user_id, nonce } => format!("{},{}", user_id, nonce),
        }
    }
}

/// An immutable credential token with its precomputed header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    method: String,
    credentials: String,
    encoded: String,
}

impl AuthToken {
    /// Create a token from a raw method label and credentials string.
    pub fn new(method: impl Into<String>, credentials: impl Into<String>) -> Self {
        let method = method.into();
        let credentials = credentials.into();
        let encoded = STANDARD.encode(format!("{}:{}", method, credentials).as_bytes());
        Self {
            method,
            credentials,
            encoded,
        }
    }

    /// Build a token for one of the known schemes.
    pub fn build(credentials: Credentials<'_>) -> Self {
        Self::new(credentials.scheme().label(), credentials.join())
    }

    pub fn admin(username: &str, password: &str) -> Self {
        Self::build(Credentials::Admin { username, password })
    }

    /// Steam auth ticket; only the first `ticket_len` bytes are encoded.
    pub fn steam(ticket: &[u8], ticket_len: usize) -> Self {
        Self::build(Credentials::Steam { ticket, ticket_len })
    }

    pub fn itch_download_key(download_key: &str) -> Self {
        Self::build(Credentials::ItchDownloadKey(download_key))
    }

    pub fn itch_api_key(api_key: &str) -> Self {
        Self::build(Credentials::ItchApiKey(api_key))
    }

    pub fn oculus(user_id: &str, nonce: &str) -> Self {
        Self::build(Credentials::Oculus { user_id, nonce })
    }

    /// The method label.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The joined credentials string.
    pub fn credentials(&self) -> &str {
        &self.credentials
    }

    /// The header value: `base64(method:credentials)`.
    pub fn as_base64(&self) -> &str {
        &self.encoded
    }
}
