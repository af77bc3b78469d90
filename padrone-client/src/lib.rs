//! Client for the Padrone game master server.
//!
//! [`PadroneClient`] exposes the master server operations (host registration,
//! listing, join/leave, heartbeats) as futures. Requests run over a fixed pool
//! of reusable transports and share one header buffer, so the client is meant
//! to be driven from a single thread.

pub mod client;
pub mod config;
pub mod engine;
pub mod headers;
pub mod health;
pub mod pool;
pub mod transport;

pub use client::PadroneClient;
pub use config::ClientConfig;
pub use engine::{parse_status, ApiResponse, RawResponse, RequestEngine, TokenProvider};
pub use headers::HeaderBuffer;
pub use health::{HealthCheckResult, HealthMonitorConfig, HealthStatus, MasterServerMonitor};
pub use pool::{Lease, PoolStats, PooledHandle, TransportPool};
pub use transport::{HyperTransport, Transport};

pub use padrone_core;
