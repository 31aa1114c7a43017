//! Messaging a user from a ghost through a fresh private room.

use crate::client::{ClientFactory, CreateRoomRequest, MessageContent};
use crate::error::WorkflowError;
use crate::poll::{PollConfig, wait_for_join};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// What to send, as whom, to whom.
#[derive(Debug, Clone)]
pub struct SendRequest {
    /// User to impersonate.
    pub sender: String,
    /// User to invite and message.
    pub target: String,
    /// Text body of the message.
    pub body: String,
    /// How to wait for the target to join.
    pub poll: PollConfig,
}

/// Outcome of a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub room_id: String,
    pub event_id: String,
    /// Membership queries issued while waiting for the target.
    pub poll_attempts: u32,
}

/// Create a private room inviting the target, wait for them to join, then
/// send the message as the sender.
///
/// Every step waits for the previous one. Nothing is retried and a room that
/// was created before a failure is left in place.
pub async fn send_message(
    factory: &dyn ClientFactory,
    request: &SendRequest,
    cancel: &CancellationToken,
) -> Result<SendReport, WorkflowError> {
    let client = factory.client_as(Some(&request.sender));

    info!("Creating new room for message...");
    let room_id = client
        .create_room(&CreateRoomRequest::trusted_private_chat(&request.target))
        .await?
        .room_id;

    info!("Waiting for target user to join...");
    let poll_attempts = wait_for_join(
        client.as_ref(),
        &room_id,
        &request.target,
        &request.poll,
        cancel,
    )
    .await?;

    info!("Sending message...");
    let event_id = client
        .send_message(&room_id, &MessageContent::text(&request.body))
        .await?
        .event_id;

    info!("Message sent as event {} in room {}", event_id, room_id);
    Ok(SendReport {
        room_id,
        event_id,
        poll_attempts,
    })
}
