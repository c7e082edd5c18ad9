//! # chorus-server
//!
//! Session engine and network surface for the chorus tone server.
//!
//! - [`registry`]: one live sound per connected client, with snapshots
//! - [`sweeper`]: periodic removal of sounds past their end time
//! - [`protocol`] / [`dispatch`]: the JSON message set and its routing
//! - [`connection`]: per-client WebSocket lifecycle with guaranteed cleanup
//! - [`server`]: Axum router, `/health`, `/metrics`, static assets, shutdown

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod errors;
pub mod health;
pub mod ids;
pub mod metrics;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod sweeper;

pub use config::{ServerConfig, SoundConfig};
pub use dispatch::Dispatcher;
pub use errors::{DispatchError, RegistryError, ServerError};
pub use ids::{ClientId, SoundId};
pub use registry::SessionRegistry;
pub use server::ChorusServer;
pub use sweeper::Sweeper;
