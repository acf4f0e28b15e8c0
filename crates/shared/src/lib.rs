//! Gamehub Protocol - wire types shared by the lobby server and its clients
//!
//! - `messages` - the `{type, event_channel, message}` envelope and channel tags
//! - `responses` - typed payloads for server-to-player messages
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - serde, serde_json, thiserror and domain ids
//! 2. **No business logic** - pure data types and serialization

pub mod messages;
pub mod responses;

pub use messages::{kinds, EnvelopeError, EventChannel, MessageFromPlayer, MessageToPlayer};
pub use responses::{
    ErrorPayload, GameCreatedPayload, GameStartedPayload, GlobalBroadcastPayload,
    NameChangedPayload, RoleAssignedPayload,
};
