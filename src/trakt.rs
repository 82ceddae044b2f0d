//! List-tracking service client.
//!
//! Authentication is not hidden in a shared client: `TraktClient` is handed
//! a [`TokenProvider`] that supplies the bearer token, refreshes it when the
//! service answers 401, and is told when the session is beyond repair.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::future::try_join_all;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{require, TraktConfig};
use crate::credentials::{CredentialStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USERNAME_KEY};
use crate::error::{ApiError, AuthError, ConfigError};
use crate::models::{ListItem, MediaKind, TraktList};

const API_VERSION: &str = "2";

/// Source of bearer tokens for authenticated calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<Option<String>, AuthError>;

    /// Returns an access token to use instead of `rejected`, exchanging the
    /// refresh token only if no other caller has replaced it already.
    async fn refresh(&self, rejected: &str) -> Result<String, AuthError>;

    /// Called when a refresh failed; the session must be dropped.
    async fn expire(&self);
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl TokenResponse {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let created = Utc.timestamp_opt(self.created_at?, 0).single()?;
        created.checked_add_signed(chrono::Duration::try_seconds(self.expires_in?)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    pub expires_in: u64,
    pub interval: u64,
}

#[derive(Debug, Deserialize)]
struct Profile {
    username: String,
}

fn base_headers(client_id: &str) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert("trakt-api-version", HeaderValue::from_static(API_VERSION));
    headers.insert(
        "trakt-api-key",
        HeaderValue::from_str(client_id).map_err(|_| ConfigError::MissingCredential("CLIENT_ID"))?,
    );
    Ok(headers)
}

fn build_client(client_id: &str) -> Result<reqwest::Client, ConfigError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .default_headers(base_headers(client_id)?)
        .build()?)
}

/// OAuth side of the tracking service: device login, refresh, revoke.
/// Tokens and username live in the credential store.
pub struct TraktAuth {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    store: Arc<dyn CredentialStore>,
    refreshing: Mutex<()>,
}

impl TraktAuth {
    pub fn new(config: &TraktConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
        let client_id = require(&config.client_id, "CLIENT_ID")?.to_string();
        let client_secret = require(&config.client_secret, "CLIENT_SECRET")?.to_string();

        Ok(Self {
            client: build_client(&client_id)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            store,
            refreshing: Mutex::new(()),
        })
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.store.get(ACCESS_TOKEN_KEY), Ok(Some(token)) if !token.is_empty())
    }

    pub fn username(&self) -> Result<Option<String>, AuthError> {
        Ok(self.store.get(USERNAME_KEY)?)
    }

    fn save_tokens(&self, tokens: &TokenResponse) -> Result<(), AuthError> {
        self.store.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, &tokens.refresh_token)?;
        if let Some(expires_at) = tokens.expires_at() {
            info!("Access token valid until {}", expires_at);
        }
        Ok(())
    }

    /// Removes all stored session data without contacting the service.
    pub fn clear(&self) -> Result<(), AuthError> {
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(REFRESH_TOKEN_KEY)?;
        self.store.remove(USERNAME_KEY)?;
        Ok(())
    }

    pub async fn refresh_tokens(&self) -> Result<TokenResponse, AuthError> {
        let refresh_token = self
            .store
            .get(REFRESH_TOKEN_KEY)?
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NoRefreshToken)?;

        let response = self
            .client
            .post(format!("{}/oauth/token", self.base_url))
            .json(&json!({
                "refresh_token": refresh_token,
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "grant_type": "refresh_token",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::RefreshRejected(response.status()));
        }

        let tokens: TokenResponse = response.json().await?;
        self.save_tokens(&tokens)?;
        info!("Tracking token refreshed");
        Ok(tokens)
    }

    pub async fn device_code(&self) -> Result<DeviceCode, AuthError> {
        let response = self
            .client
            .post(format!("{}/oauth/device/code", self.base_url))
            .json(&json!({ "client_id": self.client_id }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::DeviceCodeRejected(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Device-code login. `on_code` is shown the verification URL and user
    /// code; the service is then polled until the user approves or the code
    /// expires. Returns the username.
    pub async fn login<F>(&self, on_code: F) -> Result<String, AuthError>
    where
        F: FnOnce(&DeviceCode),
    {
        let code = self.device_code().await?;
        on_code(&code);

        let mut interval = code.interval.max(1);
        let mut waited = 0;
        while waited < code.expires_in {
            let response = self
                .client
                .post(format!("{}/oauth/device/token", self.base_url))
                .json(&json!({
                    "code": code.device_code,
                    "client_id": self.client_id,
                    "client_secret": self.client_secret,
                }))
                .send()
                .await?;

            match response.status() {
                status if status.is_success() => {
                    let tokens: TokenResponse = response.json().await?;
                    self.save_tokens(&tokens)?;
                    let username = self.fetch_username(&tokens.access_token).await?;
                    self.store.set(USERNAME_KEY, &username)?;
                    info!("Logged in as {}", username);
                    return Ok(username);
                }
                StatusCode::BAD_REQUEST => {}
                StatusCode::TOO_MANY_REQUESTS => interval += 1,
                status => return Err(AuthError::DeviceCodeRejected(status)),
            }

            tokio::time::sleep(Duration::from_secs(interval)).await;
            waited += interval;
        }

        Err(AuthError::DeviceCodeExpired)
    }

    async fn fetch_username(&self, access_token: &str) -> Result<String, AuthError> {
        let response = self
            .client
            .get(format!("{}/users/me", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::ProfileUnavailable(response.status()));
        }
        let profile: Profile = response.json().await?;
        Ok(profile.username)
    }

    /// Revokes the access token (best effort) and forgets the session.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Some(token) = self.store.get(ACCESS_TOKEN_KEY)? {
            let revoked = self
                .client
                .post(format!("{}/oauth/revoke", self.base_url))
                .json(&json!({
                    "token": token,
                    "client_id": self.client_id,
                    "client_secret": self.client_secret,
                }))
                .send()
                .await;

            match revoked {
                Ok(r) if r.status().is_success() => info!("Access token revoked"),
                Ok(r) => warn!("Token revocation returned {}", r.status()),
                Err(e) => warn!("Error revoking token: {}", e),
            }
        }

        self.clear()
    }
}

#[async_trait]
impl TokenProvider for TraktAuth {
    async fn access_token(&self) -> Result<Option<String>, AuthError> {
        Ok(self.store.get(ACCESS_TOKEN_KEY)?.filter(|t| !t.is_empty()))
    }

    async fn refresh(&self, rejected: &str) -> Result<String, AuthError> {
        let _guard = self.refreshing.lock().await;
        if let Some(current) = self.access_token().await? {
            if current != rejected {
                return Ok(current);
            }
        }
        Ok(self.refresh_tokens().await?.access_token)
    }

    async fn expire(&self) {
        warn!("Tracking session expired, logging out");
        if let Err(e) = self.clear() {
            warn!("Could not clear stored session: {}", e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrobbleAction {
    Start,
    Pause,
    Stop,
}

impl ScrobbleAction {
    fn path(self) -> &'static str {
        match self {
            ScrobbleAction::Start => "start",
            ScrobbleAction::Pause => "pause",
            ScrobbleAction::Stop => "stop",
        }
    }
}

impl std::str::FromStr for ScrobbleAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(ScrobbleAction::Start),
            "pause" => Ok(ScrobbleAction::Pause),
            "stop" => Ok(ScrobbleAction::Stop),
            other => Err(format!("unknown scrobble action: {}", other)),
        }
    }
}

/// What is being watched, by tracking-service id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrobbleTarget {
    Movie { trakt_id: u64 },
    Show { trakt_id: u64 },
    Episode { trakt_id: u64, season: u32, number: u32 },
}

impl ScrobbleTarget {
    fn body(self, progress: f64) -> Value {
        match self {
            ScrobbleTarget::Movie { trakt_id } => {
                json!({ "movie": { "ids": { "trakt": trakt_id } }, "progress": progress })
            }
            ScrobbleTarget::Show { trakt_id } => {
                json!({ "show": { "ids": { "trakt": trakt_id } }, "progress": progress })
            }
            ScrobbleTarget::Episode {
                trakt_id,
                season,
                number,
            } => json!({
                "episode": { "ids": { "trakt": trakt_id }, "season": season, "number": number },
                "progress": progress
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawIds {
    trakt: Option<u64>,
    tmdb: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    #[serde(default)]
    title: String,
    ids: RawIds,
}

#[derive(Debug, Deserialize)]
struct RawListEntry {
    #[serde(rename = "type")]
    kind: String,
    movie: Option<RawMedia>,
    show: Option<RawMedia>,
}

impl RawListEntry {
    fn into_item(self) -> Option<ListItem> {
        let (kind, media) = match self.kind.as_str() {
            "movie" => (MediaKind::Movie, self.movie?),
            "show" => (MediaKind::Show, self.show?),
            _ => return None,
        };

        Some(ListItem {
            kind,
            title: media.title,
            trakt_id: media.ids.trakt,
            tmdb_id: media.ids.tmdb,
        })
    }
}

#[derive(Debug, Serialize)]
struct TmdbRef {
    ids: TmdbIds,
}

#[derive(Debug, Serialize)]
struct TmdbIds {
    tmdb: u64,
}

fn list_payload(tmdb_id: u64, kind: MediaKind) -> Value {
    let entry = vec![TmdbRef {
        ids: TmdbIds { tmdb: tmdb_id },
    }];
    let mut payload = serde_json::Map::new();
    payload.insert(kind.trakt_plural().to_string(), json!(entry));
    Value::Object(payload)
}

/// Authenticated list-tracking API client.
pub struct TraktClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl TraktClient {
    pub fn new(config: &TraktConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, ConfigError> {
        let client_id = require(&config.client_id, "CLIENT_ID")?;

        Ok(Self {
            client: build_client(client_id)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    /// Sends with the current token. A 401 triggers one refresh and one
    /// retry; a failed refresh expires the session.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self
            .tokens
            .access_token()
            .await?
            .ok_or(AuthError::NotLoggedIn)?;
        let retry = request.try_clone();

        let response = request.bearer_auth(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check(response);
        }

        let Some(retry) = retry else {
            return check(response);
        };
        warn!("Access token rejected by {}, refreshing", response.url());

        match self.tokens.refresh(&token).await {
            Ok(token) => check(retry.bearer_auth(token).send().await?),
            Err(e) => {
                self.tokens.expire().await;
                Err(e.into())
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ApiError> {
        let response = self
            .send(self.request(Method::POST, path).json(body))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn lists(&self) -> Result<Vec<TraktList>, ApiError> {
        let lists: Vec<TraktList> = self.get_json("/users/me/lists").await?;
        info!("Fetched {} lists", lists.len());
        Ok(lists)
    }

    /// Movies and shows on a list. Other entry types are skipped.
    pub async fn list_items(&self, username: &str, list_id: &str) -> Result<Vec<ListItem>, ApiError> {
        let path = format!(
            "/users/{}/lists/{}/items",
            urlencoding::encode(username),
            urlencoding::encode(list_id)
        );
        let entries: Vec<RawListEntry> = self.get_json(&path).await?;
        Ok(entries.into_iter().filter_map(RawListEntry::into_item).collect())
    }

    pub async fn add_to_list(&self, list_id: &str, tmdb_id: u64, kind: MediaKind) -> Result<Value, ApiError> {
        let path = format!("/users/me/lists/{}/items", urlencoding::encode(list_id));
        self.post_json(&path, &list_payload(tmdb_id, kind)).await
    }

    pub async fn remove_from_list(
        &self,
        list_id: &str,
        tmdb_id: u64,
        kind: MediaKind,
    ) -> Result<Value, ApiError> {
        let path = format!("/users/me/lists/{}/items/remove", urlencoding::encode(list_id));
        self.post_json(&path, &list_payload(tmdb_id, kind)).await
    }

    /// Ids of the user's lists that contain the title. Lists are checked concurrently.
    pub async fn lists_containing(&self, tmdb_id: u64, kind: MediaKind) -> Result<Vec<u64>, ApiError> {
        let lists = self.lists().await?;

        let checks = lists.iter().map(|list| async move {
            let items = self.list_items("me", &list.ids.trakt.to_string()).await?;
            let present = items
                .iter()
                .any(|item| item.kind == kind && item.tmdb_id == Some(tmdb_id));
            Ok::<_, ApiError>((list.ids.trakt, present))
        });

        Ok(try_join_all(checks)
            .await?
            .into_iter()
            .filter(|(_, present)| *present)
            .map(|(id, _)| id)
            .collect())
    }

    /// Reports watch progress (0-100).
    pub async fn scrobble(
        &self,
        action: ScrobbleAction,
        target: ScrobbleTarget,
        progress: f64,
    ) -> Result<Value, ApiError> {
        let path = format!("/scrobble/{}", action.path());
        self.post_json(&path, &target.body(progress)).await
    }
}

fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status {
            url: response.url().to_string(),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_payload_is_keyed_by_kind() {
        assert_eq!(
            list_payload(603, MediaKind::Movie),
            json!({ "movies": [{ "ids": { "tmdb": 603 } }] })
        );
        assert_eq!(
            list_payload(1399, MediaKind::Show),
            json!({ "shows": [{ "ids": { "tmdb": 1399 } }] })
        );
    }

    #[test]
    fn episode_scrobble_carries_season_and_number() {
        let body = ScrobbleTarget::Episode {
            trakt_id: 73640,
            season: 1,
            number: 3,
        }
        .body(42.5);

        assert_eq!(
            body,
            json!({
                "episode": { "ids": { "trakt": 73640 }, "season": 1, "number": 3 },
                "progress": 42.5
            })
        );
    }

    #[test]
    fn list_entries_keep_movies_and_shows_only() {
        let entries: Vec<RawListEntry> = serde_json::from_str(
            r#"[
                {"type": "movie", "movie": {"title": "Heat", "ids": {"trakt": 1, "tmdb": 949}}},
                {"type": "show", "show": {"title": "Dark", "ids": {"trakt": 2, "tmdb": null}}},
                {"type": "person", "person": {"name": "Someone"}}
            ]"#,
        )
        .unwrap();

        let items: Vec<ListItem> = entries.into_iter().filter_map(RawListEntry::into_item).collect();
        assert_eq!(
            items,
            vec![
                ListItem {
                    kind: MediaKind::Movie,
                    title: "Heat".to_string(),
                    trakt_id: Some(1),
                    tmdb_id: Some(949),
                },
                ListItem {
                    kind: MediaKind::Show,
                    title: "Dark".to_string(),
                    trakt_id: Some(2),
                    tmdb_id: None,
                },
            ]
        );
    }

    #[test]
    fn token_expiry_from_created_at() {
        let tokens: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":7776000,"created_at":1700000000}"#,
        )
        .unwrap();
        assert_eq!(
            tokens.expires_at().map(|t| t.timestamp()),
            Some(1_700_000_000 + 7_776_000)
        );
    }

    #[test]
    fn out_of_range_expiry_is_ignored() {
        let tokens: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":9223372036854775807,"created_at":1700000000}"#,
        )
        .unwrap();
        assert_eq!(tokens.expires_at(), None);

        let tokens = TokenResponse {
            expires_in: Some(i64::MIN),
            ..tokens
        };
        assert_eq!(tokens.expires_at(), None);
    }
}
