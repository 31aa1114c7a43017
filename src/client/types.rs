//! Request and response bodies for the client/server API endpoints used here.

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Room directory visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

/// Room creation preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    PrivateChat,
    TrustedPrivateChat,
    PublicChat,
}

/// Body of `POST /createRoom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invite: Vec<String>,
    pub preset: Preset,
}

impl CreateRoomRequest {
    /// A private room inviting `user_id`, with invitees trusted as room admins.
    pub fn trusted_private_chat(user_id: impl Into<String>) -> Self {
        Self {
            visibility: Visibility::Private,
            invite: vec![user_id.into()],
            preset: Preset::TrustedPrivateChat,
        }
    }
}

/// Response of `POST /createRoom`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoomCreated {
    pub room_id: String,
}

/// `m.room.message` content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub msgtype: String,
    pub body: String,
}

impl MessageContent {
    /// Plain text message.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            msgtype: "m.text".to_string(),
            body: body.into(),
        }
    }
}

/// Response of `PUT /rooms/{roomId}/send/{eventType}/{txnId}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventSent {
    pub event_id: String,
}

/// One joined member of a room.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinedMember {
    pub user_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MemberProfile {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

/// Response of `GET /rooms/{roomId}/joined_members`.
///
/// Members keep the order the server listed them in. A missing or null
/// `joined` object decodes as no members.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct JoinedMembers {
    #[serde(default, rename = "joined", deserialize_with = "ordered_members")]
    pub members: Vec<JoinedMember>,
}

impl JoinedMembers {
    /// Snapshot from a list of user ids, without profile data.
    pub fn from_user_ids<I, S>(user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: user_ids
                .into_iter()
                .map(|user_id| JoinedMember {
                    user_id: user_id.into(),
                    ..Default::default()
                })
                .collect(),
        }
    }

    /// Joined user ids in server order.
    pub fn user_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.user_id.as_str())
    }

    /// Whether `user_id` is joined.
    pub fn contains(&self, user_id: &str) -> bool {
        self.user_ids().any(|id| id == user_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}

fn ordered_members<'de, D>(deserializer: D) -> Result<Vec<JoinedMember>, D::Error>
where
    D: Deserializer<'de>,
{
    struct MembersVisitor;

    impl<'de> Visitor<'de> for MembersVisitor {
        type Value = Vec<JoinedMember>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of user id to member profile")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_map(self)
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut members = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(user_id) = map.next_key::<String>()? {
                let profile = map
                    .next_value::<Option<MemberProfile>>()?
                    .unwrap_or_default();
                members.push(JoinedMember {
                    user_id,
                    display_name: profile.display_name,
                    avatar_url: profile.avatar_url,
                });
            }
            Ok(members)
        }
    }

    deserializer.deserialize_option(MembersVisitor)
}

/// Standard error body returned by the homeserver.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default = "unknown_errcode")]
    pub errcode: String,
    #[serde(default)]
    pub error: String,
}

fn unknown_errcode() -> String {
    "M_UNKNOWN".to_string()
}
