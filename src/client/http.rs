//! HTTP client for the client/server API.
//!
//! Requests authenticate with the registration's `as_token` and impersonate a
//! user through the `user_id` query parameter, as application services do.

use super::types::{
    CreateRoomRequest, ErrorBody, EventSent, JoinedMembers, MessageContent, RoomCreated,
};
use super::{CLIENT_API_PREFIX, ClientFactory, MatrixClient};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Timeout for a single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default client/server API base URL.
pub const DEFAULT_CSAPI: &str = "http://localhost:8008";

/// Settings the factory authenticates with.
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// User id of the bridge bot, used when no identity is requested.
    pub app_service_user_id: String,
    /// The registration's `as_token`.
    pub token: String,
    /// Base URL of the client/server API.
    pub base_url: String,
}

/// Builds [`HttpMatrixClient`]s sharing one connection pool.
pub struct HttpClientFactory {
    http: Client,
    base_url: Url,
    token: String,
    app_service_user_id: String,
}

impl HttpClientFactory {
    /// Create a factory, rejecting a base URL requests cannot be built on.
    pub fn new(config: FactoryConfig) -> ClientResult<Self> {
        let base_url = parse_base_url(&config.base_url)?;

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("appservice-admin/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            http,
            base_url,
            token: config.token,
            app_service_user_id: config.app_service_user_id,
        })
    }

    /// Concrete client acting as `user_id`, or the bridge bot when `None`.
    pub fn http_client_as(&self, user_id: Option<&str>) -> HttpMatrixClient {
        HttpMatrixClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            user_id: user_id
                .unwrap_or(self.app_service_user_id.as_str())
                .to_string(),
        }
    }
}

impl ClientFactory for HttpClientFactory {
    fn client_as(&self, user_id: Option<&str>) -> Box<dyn MatrixClient> {
        Box::new(self.http_client_as(user_id))
    }
}

fn parse_base_url(raw: &str) -> ClientResult<Url> {
    let invalid = |reason: String| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("cannot be used as a base".to_string()));
    }
    Ok(url)
}

/// Client acting as one user through the application service token.
#[derive(Clone)]
pub struct HttpMatrixClient {
    http: Client,
    base_url: Url,
    token: String,
    user_id: String,
}

impl std::fmt::Debug for HttpMatrixClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMatrixClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl HttpMatrixClient {
    /// Full URL for an API path, with the impersonation parameter attached.
    ///
    /// Each segment is percent-encoded on its own, so room ids may contain
    /// any character.
    pub fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidBaseUrl {
                    url: self.base_url.to_string(),
                    reason: "cannot be used as a base".to_string(),
                })?;
            path.pop_if_empty();
            path.extend(CLIENT_API_PREFIX.split('/').filter(|s| !s.is_empty()));
            path.extend(segments);
        }
        url.query_pairs_mut().append_pair("user_id", &self.user_id);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ClientResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        debug!(method = %method, path = %url.path(), user_id = %self.user_id, "Client API request");
        Ok(self.http.request(method, url).bearer_auth(&self.token))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = check_status(request.send().await?).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn execute_empty(&self, request: RequestBuilder) -> ClientResult<()> {
        check_status(request.send().await?).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let error = serde_json::from_slice::<ErrorBody>(&body).unwrap_or_else(|_| ErrorBody {
        errcode: "M_UNKNOWN".to_string(),
        error: status.canonical_reason().unwrap_or("unknown error").to_string(),
    });

    Err(ClientError::Api {
        status: status.as_u16(),
        errcode: error.errcode,
        message: error.error,
    })
}

#[async_trait]
impl MatrixClient for HttpMatrixClient {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn create_room(&self, request: &CreateRoomRequest) -> ClientResult<RoomCreated> {
        let builder = self.request(Method::POST, &["createRoom"])?.json(request);
        self.execute(builder).await
    }

    async fn leave(&self, room_id: &str) -> ClientResult<()> {
        let builder = self
            .request(Method::POST, &["rooms", room_id, "leave"])?
            .json(&serde_json::json!({}));
        self.execute_empty(builder).await
    }

    async fn send_message(
        &self,
        room_id: &str,
        content: &MessageContent,
    ) -> ClientResult<EventSent> {
        let txn_id = Uuid::new_v4().simple().to_string();
        let builder = self
            .request(
                Method::PUT,
                &["rooms", room_id, "send", "m.room.message", &txn_id],
            )?
            .json(content);
        self.execute(builder).await
    }

    async fn joined_members(&self, room_id: &str) -> ClientResult<JoinedMembers> {
        let builder = self.request(Method::GET, &["rooms", room_id, "joined_members"])?;
        self.execute(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(base_url: &str) -> HttpClientFactory {
        HttpClientFactory::new(FactoryConfig {
            app_service_user_id: "@bot:example.org".to_string(),
            token: "secret".to_string(),
            base_url: base_url.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn bot_client_acts_as_app_service_user() {
        let client = factory(DEFAULT_CSAPI).http_client_as(None);
        assert_eq!(client.user_id(), "@bot:example.org");
    }

    #[test]
    fn endpoint_encodes_room_id_and_user() {
        let client = factory(DEFAULT_CSAPI).http_client_as(Some("@_bridge_a:example.org"));
        let url = client
            .endpoint(&["rooms", "!room/with#odd:example.org", "joined_members"])
            .unwrap();
        assert_eq!(
            url.path(),
            "/_matrix/client/r0/rooms/!room%2Fwith%23odd:example.org/joined_members"
        );
        let pairs: Vec<_> = url.query_pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "user_id");
        assert_eq!(pairs[0].1, "@_bridge_a:example.org");
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let client = factory("https://matrix.example.org/proxy/").http_client_as(None);
        let url = client.endpoint(&["createRoom"]).unwrap();
        assert_eq!(url.path(), "/proxy/_matrix/client/r0/createRoom");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpClientFactory::new(FactoryConfig {
            app_service_user_id: "@bot:x".to_string(),
            token: "t".to_string(),
            base_url: "localhost:8008 nope".to_string(),
        })
        .err()
        .unwrap();
        assert!(matches!(err, ClientError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn debug_redacts_token() {
        let client = factory(DEFAULT_CSAPI).http_client_as(None);
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
