//! Scripted in-memory homeserver.
//!
//! Records every factory and client call in order and answers from scripted
//! responses. Membership snapshots are served from a queue; once it drains,
//! the last snapshot keeps being returned.

use super::types::{CreateRoomRequest, EventSent, JoinedMembers, MessageContent, RoomCreated};
use super::{ClientFactory, MatrixClient};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ClientAs(Option<String>),
    CreateRoom {
        user_id: String,
        request: CreateRoomRequest,
    },
    Leave {
        user_id: String,
        room_id: String,
    },
    SendMessage {
        user_id: String,
        room_id: String,
        content: MessageContent,
    },
    JoinedMembers {
        user_id: String,
        room_id: String,
    },
}

impl MockCall {
    /// Whether the call would have reached the homeserver.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::ClientAs(_))
    }
}

/// Scripted failure, turned into a [`ClientError::Api`] when served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFailure {
    pub status: u16,
    pub errcode: String,
}

impl MockFailure {
    pub fn new(status: u16, errcode: impl Into<String>) -> Self {
        Self {
            status,
            errcode: errcode.into(),
        }
    }

    fn to_error(&self) -> ClientError {
        ClientError::Api {
            status: self.status,
            errcode: self.errcode.clone(),
            message: "scripted failure".to_string(),
        }
    }
}

enum MembershipReply {
    Snapshot(JoinedMembers),
    Failure(MockFailure),
}

struct MockState {
    app_service_user_id: String,
    calls: Vec<MockCall>,
    memberships: VecDeque<MembershipReply>,
    last_snapshot: JoinedMembers,
    room_id: String,
    event_id: String,
    create_room_failure: Option<MockFailure>,
    send_failure: Option<MockFailure>,
    leave_failures: HashSet<String>,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory stand-in for a homeserver, usable as a [`ClientFactory`].
#[derive(Clone)]
pub struct MockHomeserver {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockHomeserver {
    fn default() -> Self {
        Self::new("@bot:mock")
    }
}

impl MockHomeserver {
    /// Create a mock whose bot client acts as `app_service_user_id`.
    pub fn new(app_service_user_id: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                app_service_user_id: app_service_user_id.into(),
                calls: Vec::new(),
                memberships: VecDeque::new(),
                last_snapshot: JoinedMembers::default(),
                room_id: "!created:mock".to_string(),
                event_id: "$event:mock".to_string(),
                create_room_failure: None,
                send_failure: None,
                leave_failures: HashSet::new(),
                in_flight: 0,
                max_in_flight: 0,
            })),
        }
    }

    /// Room id returned by `create_room`.
    pub fn with_room_id(self, room_id: impl Into<String>) -> Self {
        self.state.lock().room_id = room_id.into();
        self
    }

    /// Event id returned by `send_message`.
    pub fn with_event_id(self, event_id: impl Into<String>) -> Self {
        self.state.lock().event_id = event_id.into();
        self
    }

    /// Queue a membership snapshot.
    pub fn push_members<I, S>(&self, user_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_snapshot(JoinedMembers::from_user_ids(user_ids));
    }

    /// Queue a decoded membership snapshot.
    pub fn push_snapshot(&self, snapshot: JoinedMembers) {
        self.state
            .lock()
            .memberships
            .push_back(MembershipReply::Snapshot(snapshot));
    }

    /// Queue a failing membership query.
    pub fn push_membership_failure(&self, failure: MockFailure) {
        self.state
            .lock()
            .memberships
            .push_back(MembershipReply::Failure(failure));
    }

    pub fn fail_create_room(&self, failure: MockFailure) {
        self.state.lock().create_room_failure = Some(failure);
    }

    pub fn fail_send(&self, failure: MockFailure) {
        self.state.lock().send_failure = Some(failure);
    }

    /// Make `leave` fail when issued by `user_id`.
    pub fn fail_leave_for(&self, user_id: impl Into<String>) {
        self.state.lock().leave_failures.insert(user_id.into());
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Calls that would have reached the homeserver.
    pub fn remote_calls(&self) -> Vec<MockCall> {
        self.calls().into_iter().filter(MockCall::is_remote).collect()
    }

    /// Number of membership queries served.
    pub fn membership_queries(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::JoinedMembers { .. }))
            .count()
    }

    /// Highest number of remote calls that were ever outstanding at once.
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().max_in_flight
    }

    fn begin(&self, call: MockCall) {
        let mut state = self.state.lock();
        state.calls.push(call);
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
    }

    async fn finish(&self) {
        // Give any other task a chance to run while this call is outstanding.
        tokio::task::yield_now().await;
        self.state.lock().in_flight -= 1;
    }
}

impl ClientFactory for MockHomeserver {
    fn client_as(&self, user_id: Option<&str>) -> Box<dyn MatrixClient> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::ClientAs(user_id.map(str::to_string)));
        let user_id = user_id
            .unwrap_or(state.app_service_user_id.as_str())
            .to_string();
        Box::new(MockClient {
            user_id,
            server: self.clone(),
        })
    }
}

/// Client handed out by [`MockHomeserver`].
pub struct MockClient {
    user_id: String,
    server: MockHomeserver,
}

#[async_trait]
impl MatrixClient for MockClient {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn create_room(&self, request: &CreateRoomRequest) -> ClientResult<RoomCreated> {
        self.server.begin(MockCall::CreateRoom {
            user_id: self.user_id.clone(),
            request: request.clone(),
        });
        self.server.finish().await;

        let state = self.server.state.lock();
        match &state.create_room_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(RoomCreated {
                room_id: state.room_id.clone(),
            }),
        }
    }

    async fn leave(&self, room_id: &str) -> ClientResult<()> {
        self.server.begin(MockCall::Leave {
            user_id: self.user_id.clone(),
            room_id: room_id.to_string(),
        });
        self.server.finish().await;

        if self.server.state.lock().leave_failures.contains(&self.user_id) {
            return Err(MockFailure::new(403, "M_FORBIDDEN").to_error());
        }
        Ok(())
    }

    async fn send_message(
        &self,
        room_id: &str,
        content: &MessageContent,
    ) -> ClientResult<EventSent> {
        self.server.begin(MockCall::SendMessage {
            user_id: self.user_id.clone(),
            room_id: room_id.to_string(),
            content: content.clone(),
        });
        self.server.finish().await;

        let state = self.server.state.lock();
        match &state.send_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(EventSent {
                event_id: state.event_id.clone(),
            }),
        }
    }

    async fn joined_members(&self, room_id: &str) -> ClientResult<JoinedMembers> {
        self.server.begin(MockCall::JoinedMembers {
            user_id: self.user_id.clone(),
            room_id: room_id.to_string(),
        });
        self.server.finish().await;

        let mut state = self.server.state.lock();
        match state.memberships.pop_front() {
            Some(MembershipReply::Snapshot(snapshot)) => {
                state.last_snapshot = snapshot.clone();
                Ok(snapshot)
            }
            Some(MembershipReply::Failure(failure)) => Err(failure.to_error()),
            None => Ok(state.last_snapshot.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_in_order() {
        let server = MockHomeserver::new("@bot:x");
        server.push_members(["@a:x"]);

        let bot = server.client_as(None);
        assert_eq!(bot.user_id(), "@bot:x");
        let members = bot.joined_members("!r:x").await.unwrap();
        assert!(members.contains("@a:x"));

        assert_eq!(
            server.calls(),
            vec![
                MockCall::ClientAs(None),
                MockCall::JoinedMembers {
                    user_id: "@bot:x".to_string(),
                    room_id: "!r:x".to_string(),
                },
            ]
        );
        assert_eq!(server.remote_calls().len(), 1);
    }

    #[tokio::test]
    async fn last_snapshot_repeats_when_queue_drains() {
        let server = MockHomeserver::default();
        server.push_members(["@a:x"]);
        let client = server.client_as(None);
        client.joined_members("!r:x").await.unwrap();
        let again = client.joined_members("!r:x").await.unwrap();
        assert!(again.contains("@a:x"));
        assert_eq!(server.membership_queries(), 2);
    }

    #[tokio::test]
    async fn scripted_failures_surface_as_api_errors() {
        let server = MockHomeserver::default();
        server.push_membership_failure(MockFailure::new(404, "M_NOT_FOUND"));
        let err = server
            .client_as(None)
            .joined_members("!r:x")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
    }
}
