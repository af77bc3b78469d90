//! Reusable request header buffer.

use padrone_core::{ClientError, ClientResult};

pub const ACCEPT: &str = "Accept";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTH: &str = "X-Padrone-Auth";

/// Ordered header name/value pairs with a fixed capacity.
///
/// The engine owns one buffer and clears it before composing each request.
#[derive(Debug, Clone)]
pub struct HeaderBuffer {
    entries: Vec<(String, String)>,
    capacity: usize,
}

impl HeaderBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Remove every pair.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Add a header, replacing the value if the name is already present.
    ///
    /// Names compare case-insensitively. A new name on a full buffer is an
    /// error rather than being dropped.
    pub fn add(&mut self, name: &str, value: &str) -> ClientResult<()> {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            entry.1 = value.to_string();
            return Ok(());
        }
        if self.entries.len() >= self.capacity {
            return Err(ClientError::HeaderCapacity {
                name: name.to_string(),
                capacity: self.capacity,
            });
        }
        self.entries.push((name.to_string(), value.to_string()));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
