#![forbid(unsafe_code)]
#![deny(
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! HTTP persistence backend for user preferences.
//!
//! The backend exchanges the full `SettingsSnapshot` with
//! `{base}/v1/preferences`: `GET` to load (404 means nothing stored yet) and
//! `PUT` to replace. Failures map onto `PersistenceError` so the store can
//! report them without knowing about HTTP.

use std::time::Duration;

use agora_prefs::{PersistenceError, PreferencePersistence, SettingsSnapshot};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Path of the preferences resource relative to the API base URL.
pub const PREFERENCES_PATH: &str = "v1/preferences";
/// Header carrying the API key.
pub const HEADER_API_KEY: &str = "x-agora-api-key";
/// Header carrying a per-request correlation id.
pub const HEADER_REQUEST_ID: &str = "x-request-id";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while constructing the HTTP backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The base URL could not be joined with the preferences path.
    #[error("invalid API base URL")]
    InvalidBaseUrl {
        /// Base URL supplied by the caller.
        base_url: String,
        /// URL parse failure.
        source: url::ParseError,
    },
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client")]
    ClientBuild {
        /// Builder failure.
        source: reqwest::Error,
    },
}

/// RFC 9457 problem document returned on rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Short summary.
    pub title: String,
    /// HTTP status echoed by the server.
    pub status: u16,
    /// Human-readable explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Preferences backend talking to the Agora API.
#[derive(Debug, Clone)]
pub struct HttpPreferencePersistence {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpPreferencePersistence {
    /// Build a backend with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the URL is unusable or the client cannot be
    /// built.
    pub fn new(
        base_url: &Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::ClientBuild { source })?;
        Self::with_client(client, base_url, api_key)
    }

    /// Build a backend around an existing client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] when the preferences path cannot
    /// be joined onto `base_url`.
    pub fn with_client(
        client: Client,
        base_url: &Url,
        api_key: Option<String>,
    ) -> Result<Self, ClientError> {
        let endpoint = preferences_endpoint(base_url).map_err(|source| {
            ClientError::InvalidBaseUrl {
                base_url: base_url.to_string(),
                source,
            }
        })?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// Resolved preferences endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, self.endpoint.clone())
            .header(HEADER_REQUEST_ID, Uuid::new_v4().to_string());
        match &self.api_key {
            Some(key) => builder.header(HEADER_API_KEY, key),
            None => builder,
        }
    }
}

/// Resolve the preferences resource underneath `base_url`, keeping any path
/// prefix the base carries (`https://host/api` and `https://host/api/` both
/// yield `https://host/api/v1/preferences`).
fn preferences_endpoint(base_url: &Url) -> Result<Url, url::ParseError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(PREFERENCES_PATH)
}

fn transport_error(err: &reqwest::Error) -> PersistenceError {
    if err.is_timeout() {
        PersistenceError::Timeout
    } else {
        PersistenceError::Network {
            detail: err.to_string(),
        }
    }
}

/// Map a non-success response onto a persistence failure.
async fn classify_problem(response: Response) -> PersistenceError {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PersistenceError::Unauthorized,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            let bytes = response.bytes().await.unwrap_or_default();
            let detail = serde_json::from_slice::<ProblemDetails>(&bytes).map_or_else(
                |_| {
                    let body = String::from_utf8_lossy(&bytes).trim().to_string();
                    if body.is_empty() {
                        format!("request rejected with status {status}")
                    } else {
                        body
                    }
                },
                |problem| problem.detail.unwrap_or(problem.title),
            );
            PersistenceError::Validation { detail }
        }
        other => PersistenceError::Server {
            status: other.as_u16(),
        },
    }
}

#[async_trait]
impl PreferencePersistence for HttpPreferencePersistence {
    #[instrument(name = "http_preferences.load", skip(self), fields(endpoint = %self.endpoint))]
    async fn load(&self) -> Result<Option<SettingsSnapshot>, PersistenceError> {
        let response = self
            .request(reqwest::Method::GET)
            .send()
            .await
            .map_err(|err| transport_error(&err))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("no stored preferences on server");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(classify_problem(response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| transport_error(&err))?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| PersistenceError::Corrupt {
                detail: err.to_string(),
            })
    }

    #[instrument(name = "http_preferences.store", skip_all, fields(endpoint = %self.endpoint))]
    async fn store(&self, snapshot: &SettingsSnapshot) -> Result<(), PersistenceError> {
        let response = self
            .request(reqwest::Method::PUT)
            .json(snapshot)
            .send()
            .await
            .map_err(|err| transport_error(&err))?;

        if response.status().is_success() {
            debug!(status = %response.status(), "preferences stored");
            Ok(())
        } else {
            Err(classify_problem(response).await)
        }
    }
}
