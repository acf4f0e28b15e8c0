//! Gamehub Engine library.
//!
//! Everything with a runtime lives here.
//!
//! ## Structure
//!
//! - `transport/` - the `Connection` port and its WebSocket adapter
//! - `session/` - player sessions: one control loop per player
//! - `hub/` - the lobby registry, roster broadcast and idle eviction
//! - `games/` - the game plugin contract and Secret Moose
//! - `api/` - HTTP and WebSocket entry points
//! - `config` - environment-driven settings

pub mod api;
pub mod config;
pub mod error;
pub mod games;
pub mod hub;
pub mod session;
pub mod transport;

/// End-to-end tests over a real socket.
#[cfg(test)]
mod e2e_tests;

pub use config::{HubConfig, ServerConfig};
pub use hub::Hub;
