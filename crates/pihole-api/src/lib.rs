// # Pi-hole v6 API Store
//
// This crate implements the `ListStore` and `GroupStore` traits against the
// Pi-hole v6 REST API.
//
// ## Behavior
//
// - One session per run: `connect` authenticates, `close` logs out
// - One HTTP request per trait call, 30 second timeout
// - Full error propagation to the reconciler
// - NO retry logic (re-running the reconciliation is the recovery path)
// - NO caching between calls
//
// ## Trust Level: Untrusted (Store)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS calls to the configured instance only
// - ✅ Parse Pi-hole responses into core types
//
// **Forbidden Capabilities**:
// - ❌ Retry, back off or spawn tasks
// - ❌ Decide whether a write is needed (owned by the differ)
//
// ## Security Requirements
//
// - The password and session ID NEVER appear in logs or Debug output
//
// ## API Reference
//
// - Login: POST `/api/auth` `{"password": ...}`, logout: DELETE `/api/auth`
// - Lists: GET/POST `/api/lists?type=...`
// - One list: GET/PUT/DELETE `/api/lists/{address}?type=...`
// - Batch delete: POST `/api/lists:batchDelete` `[{"item": ..., "type": ...}]`
// - Groups: GET `/api/groups`

use async_trait::async_trait;
use pihole_core::{
    ConnectionConfig, Error, Group, GroupId, GroupStore, ListEntry, ListKey, ListStore, ListType,
    Result,
};
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Session header expected by the v6 API
const SESSION_HEADER: &str = "X-FTL-SID";

/// Store name used in errors and logs
const STORE_NAME: &str = "pihole";

/// Authenticated Pi-hole v6 API client
///
/// Cloning is cheap and every clone shares the same session, so one client
/// can back both the list store and the group store of a reconciler.
#[derive(Clone)]
pub struct PiholeClient {
    inner: Arc<Session>,
}

struct Session {
    /// Instance base URL
    base: Url,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Session ID returned by `/api/auth`
    /// ⚠️ NEVER log this value
    sid: String,
}

// Custom Debug implementation that hides the session ID
impl std::fmt::Debug for PiholeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiholeClient")
            .field("base", &self.inner.base.as_str())
            .field("sid", &"<REDACTED>")
            .finish()
    }
}

#[derive(Deserialize)]
struct AuthResponse {
    session: AuthSession,
}

#[derive(Deserialize)]
struct AuthSession {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    sid: Option<String>,
}

#[derive(Deserialize)]
struct ListsResponse {
    #[serde(default)]
    lists: Vec<WireList>,
}

/// A list record as returned by the API (ids and timestamps are ignored)
#[derive(Deserialize)]
struct WireList {
    address: String,
    #[serde(rename = "type")]
    list_type: ListType,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    groups: Vec<GroupId>,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

impl From<WireList> for ListEntry {
    fn from(wire: WireList) -> Self {
        ListEntry::new(wire.address, wire.list_type)
            .with_enabled(wire.enabled)
            .with_comment(wire.comment.unwrap_or_default())
            .with_groups(wire.groups)
    }
}

#[derive(Deserialize)]
struct GroupsResponse {
    #[serde(default)]
    groups: Vec<Group>,
}

/// Request body for list creation and update
#[derive(Serialize)]
struct ListPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<&'a str>,
    comment: &'a str,
    groups: Vec<GroupId>,
    enabled: bool,
}

impl<'a> ListPayload<'a> {
    fn create(entry: &'a ListEntry) -> Self {
        Self {
            address: Some(&entry.address),
            ..Self::update(entry)
        }
    }

    fn update(entry: &'a ListEntry) -> Self {
        Self {
            address: None,
            comment: &entry.comment,
            groups: entry.groups.iter().copied().collect(),
            enabled: entry.enabled,
        }
    }
}

fn default_enabled() -> bool {
    true
}

impl PiholeClient {
    /// Authenticate against a Pi-hole instance and open a session
    ///
    /// # Returns
    ///
    /// - `Ok(PiholeClient)`: An authenticated client
    /// - `Err(Error::Config)`: The URL or password is unusable
    /// - `Err(Error::Connection)`: The instance could not be reached
    /// - `Err(Error::Authentication)`: The password was rejected
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let base = Url::parse(&config.url)
            .map_err(|e| Error::config(format!("Invalid Pi-hole URL {}: {}", config.url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::connection(format!("Failed to build HTTP client: {}", e)))?;

        let url = endpoint(&base, &["api", "auth"])?;
        tracing::debug!("POST {}", url.path());

        let response = client
            .post(url)
            .json(&json!({ "password": config.password }))
            .send()
            .await
            .map_err(|e| Error::connection(format!("{}: {}", base, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, "login"))?;
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => {
                    Error::auth(format!("Pi-hole rejected the password ({})", status))
                }
                _ => status_error(status, &body, "login"),
            });
        }

        let auth: AuthResponse = serde_json::from_str(&body)
            .map_err(|e| Error::auth(format!("Unexpected login response: {}", e)))?;

        let sid = match auth.session {
            AuthSession {
                valid: true,
                sid: Some(sid),
            } if !sid.is_empty() => sid,
            _ => return Err(Error::auth("Pi-hole did not grant a valid session")),
        };

        tracing::info!("Authenticated with Pi-hole at {}", base);

        Ok(Self {
            inner: Arc::new(Session { base, client, sid }),
        })
    }

    /// Log out and invalidate the session
    ///
    /// Every clone shares the session, so none of them can be used afterwards.
    pub async fn close(&self) -> Result<()> {
        let url = self.url(&["api", "auth"])?;
        self.send(Method::DELETE, url, None, "logout").await?;
        tracing::debug!("Pi-hole session closed");
        Ok(())
    }

    /// Build an endpoint URL below the instance base
    fn url(&self, segments: &[&str]) -> Result<Url> {
        endpoint(&self.inner.base, segments)
    }

    /// Build `/api/lists[/{address}]?type=...`
    fn lists_url(&self, address: Option<&str>, list_type: ListType) -> Result<Url> {
        let mut url = match address {
            Some(address) => self.url(&["api", "lists", address])?,
            None => self.url(&["api", "lists"])?,
        };
        url.query_pairs_mut().append_pair("type", list_type.as_str());
        Ok(url)
    }

    /// Issue one authenticated request
    ///
    /// # Returns
    ///
    /// The decoded JSON body, or `Value::Null` for an empty body
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        context: &str,
    ) -> Result<Value> {
        tracing::debug!("{} {}", method, url.path());

        let mut request = self
            .inner
            .client
            .request(method, url)
            .header(SESSION_HEADER, &self.inner.sid);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| transport_error(e, context))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| transport_error(e, context))?;
        if !status.is_success() {
            return Err(status_error(status, &text, context));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            Error::provider(STORE_NAME, format!("{}: invalid response body: {}", context, e))
        })
    }
}

#[async_trait]
impl ListStore for PiholeClient {
    async fn list(&self, list_type: ListType) -> Result<Vec<ListEntry>> {
        let url = self.lists_url(None, list_type)?;
        let body = self.send(Method::GET, url, None, "list lists").await?;
        decode_lists(body, list_type)
    }

    async fn get(&self, key: &ListKey) -> Result<Option<ListEntry>> {
        let url = self.lists_url(Some(&key.address), key.list_type)?;
        match self.send(Method::GET, url, None, "get list").await {
            Ok(body) => Ok(decode_lists(body, key.list_type)?
                .into_iter()
                .find(|entry| entry.address == key.address)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, entry: &ListEntry) -> Result<Value> {
        let url = self.lists_url(None, entry.list_type)?;
        let body = serde_json::to_value(ListPayload::create(entry))?;
        self.send(Method::POST, url, Some(body), "create list").await
    }

    async fn update(&self, entry: &ListEntry) -> Result<Value> {
        let url = self.lists_url(Some(&entry.address), entry.list_type)?;
        let body = serde_json::to_value(ListPayload::update(entry))?;
        self.send(Method::PUT, url, Some(body), "update list").await
    }

    async fn delete(&self, key: &ListKey) -> Result<Value> {
        let url = self.lists_url(Some(&key.address), key.list_type)?;
        self.send(Method::DELETE, url, None, "delete list").await
    }

    fn supports_batch_delete(&self) -> bool {
        true
    }

    async fn batch_delete(&self, keys: &[ListKey]) -> Result<Value> {
        let url = self.url(&["api", "lists:batchDelete"])?;
        let body: Vec<Value> = keys
            .iter()
            .map(|key| json!({ "item": key.address, "type": key.list_type }))
            .collect();
        self.send(Method::POST, url, Some(Value::Array(body)), "batch delete lists")
            .await
    }

    fn store_name(&self) -> &'static str {
        STORE_NAME
    }
}

#[async_trait]
impl GroupStore for PiholeClient {
    async fn list_groups(&self) -> Result<Vec<Group>> {
        let url = self.url(&["api", "groups"])?;
        let body = self.send(Method::GET, url, None, "list groups").await?;
        let response: GroupsResponse = serde_json::from_value(body).map_err(|e| {
            Error::provider(STORE_NAME, format!("list groups: unexpected response: {}", e))
        })?;
        Ok(response.groups)
    }
}

/// Append percent-encoded path segments to the base URL
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| Error::config(format!("Pi-hole URL cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Decode a `{"lists": [...]}` body, keeping only entries of `list_type`
fn decode_lists(body: Value, list_type: ListType) -> Result<Vec<ListEntry>> {
    let response: ListsResponse = serde_json::from_value(body).map_err(|e| {
        Error::provider(STORE_NAME, format!("unexpected lists response: {}", e))
    })?;

    Ok(response
        .lists
        .into_iter()
        .filter(|wire| wire.list_type == list_type)
        .map(ListEntry::from)
        .collect())
}

/// Map a failed HTTP exchange to a core error
fn transport_error(err: reqwest::Error, context: &str) -> Error {
    if err.is_timeout() {
        Error::http(format!("{}: request timed out", context))
    } else if err.is_connect() {
        Error::connection(format!("{}: {}", context, err))
    } else {
        Error::http(format!("{}: {}", context, err))
    }
}

/// Map a non-success status to a core error
///
/// Pi-hole reports errors as `{"error": {"key", "message", "hint"}}`; the
/// message is used when present.
fn status_error(status: StatusCode, body: &str, context: &str) -> Error {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    match status.as_u16() {
        401 | 403 => Error::auth(format!("{}: session rejected ({})", context, status)),
        404 => Error::not_found(format!("{}: {}", context, detail)),
        429 => Error::rate_limited(format!("{}: {}", context, status)),
        500..=599 => Error::provider(
            STORE_NAME,
            format!("{}: server error (transient): {} - {}", context, status, detail),
        ),
        _ => Error::provider(STORE_NAME, format!("{}: {} - {}", context, status, detail)),
    }
}
