//! Client/server API access for the bridge.
//!
//! - [`types`]: request and response bodies
//! - [`http`]: reqwest-backed client authenticating as the application service
//! - [`mock`]: scripted in-memory client for tests
//!
//! Workflows only see the [`ClientFactory`] and [`MatrixClient`] traits, so
//! the HTTP transport can be swapped for a fake.

pub mod http;
pub mod mock;
pub mod types;

pub use http::{FactoryConfig, HttpClientFactory, HttpMatrixClient};
pub use types::{
    CreateRoomRequest, EventSent, JoinedMember, JoinedMembers, MessageContent, Preset,
    RoomCreated, Visibility,
};

use crate::error::ClientResult;
use async_trait::async_trait;

/// Path prefix of the client/server API.
pub const CLIENT_API_PREFIX: &str = "/_matrix/client/r0";

/// A session acting as a single identity.
#[async_trait]
pub trait MatrixClient: Send + Sync {
    /// The user id this client acts as.
    fn user_id(&self) -> &str;

    /// Create a room and return its id.
    async fn create_room(&self, request: &CreateRoomRequest) -> ClientResult<RoomCreated>;

    /// Leave a room.
    async fn leave(&self, room_id: &str) -> ClientResult<()>;

    /// Send an `m.room.message` event.
    async fn send_message(&self, room_id: &str, content: &MessageContent)
    -> ClientResult<EventSent>;

    /// Fetch the current joined members of a room.
    async fn joined_members(&self, room_id: &str) -> ClientResult<JoinedMembers>;
}

/// Produces clients acting as arbitrary identities under one registration.
pub trait ClientFactory: Send + Sync {
    /// A fresh client acting as `user_id`, or as the bridge bot when `None`.
    fn client_as(&self, user_id: Option<&str>) -> Box<dyn MatrixClient>;
}
