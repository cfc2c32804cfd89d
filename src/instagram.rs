use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::InstagramConfig;
use crate::errors::{ApiError, ErrorCodeLookup, ErrorCodeRegistry};

const MEDIA_FIELDS: &str = "id,caption,media_url,permalink,timestamp";

/// Latest post of the tracked account. Two polls returning equal posts are
/// the same post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub media_url: String,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("request to content source failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content source returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("content source rejected the request: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    UnknownErrorCode(#[from] ErrorCodeLookup),
    #[error("content source returned no posts")]
    Empty,
    #[error("invalid response from content source: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid content source url: {0}")]
    Url(#[from] url::ParseError),
    #[error("no instagram access token configured")]
    MissingToken,
}

impl PollError {
    /// Transient failures skip one cycle; the rest stop tracking.
    pub fn is_transient(&self) -> bool {
        match self {
            PollError::Http(err) => err.is_timeout() || err.is_connect(),
            PollError::Status { status, .. } => *status == 429 || *status >= 500,
            PollError::Api(err) => err.kind.is_transient(),
            PollError::Empty => true,
            PollError::UnknownErrorCode(_)
            | PollError::Decode(_)
            | PollError::Url(_)
            | PollError::MissingToken => false,
        }
    }
}

#[async_trait]
pub trait PostSource: Send + Sync {
    async fn latest_post(&self) -> Result<Post, PollError>;
}

#[derive(Debug, Deserialize)]
struct MediaEnvelope {
    #[serde(default)]
    data: Vec<Post>,
    #[serde(default)]
    error: Option<GraphError>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    #[serde(default)]
    message: String,
    code: i64,
}

/// Polls the Instagram Graph API media edge of one account.
pub struct GraphApiClient {
    client: Client,
    endpoint: Url,
    access_token: Option<SecretString>,
    registry: ErrorCodeRegistry,
}

impl GraphApiClient {
    pub fn new(config: &InstagramConfig) -> Result<Self, PollError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: media_endpoint(&config.api_base_url, &config.user_id)?,
            access_token: config
                .access_token()
                .map(|token| SecretString::from(token.to_string())),
            registry: ErrorCodeRegistry::graph_api(),
        })
    }
}

#[async_trait]
impl PostSource for GraphApiClient {
    async fn latest_post(&self) -> Result<Post, PollError> {
        let token = self.access_token.as_ref().ok_or(PollError::MissingToken)?;

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("access_token", token.expose_secret());

        debug!("polling content source {}", self.endpoint);

        // Strip the url from errors so the token never ends up in logs.
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(reqwest::Error::without_url)?;

        parse_media_response(status, &body, &self.registry)
    }
}

fn media_endpoint(base: &str, user_id: &str) -> Result<Url, PollError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push(user_id)
        .push("media");
    url.query_pairs_mut()
        .append_pair("fields", MEDIA_FIELDS)
        .append_pair("limit", "1");
    Ok(url)
}

fn parse_media_response(
    status: u16,
    body: &[u8],
    registry: &ErrorCodeRegistry,
) -> Result<Post, PollError> {
    let envelope: MediaEnvelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) if !(200..300).contains(&status) => {
            return Err(PollError::Status {
                status,
                body: String::from_utf8_lossy(body).chars().take(200).collect(),
            });
        }
        Err(err) => return Err(PollError::Decode(err)),
    };

    if let Some(error) = envelope.error {
        if let Some(api_error) = registry.translate(error.code, error.message)? {
            return Err(api_error.into());
        }
    }

    if !(200..300).contains(&status) {
        return Err(PollError::Status {
            status,
            body: String::new(),
        });
    }

    envelope.data.into_iter().next().ok_or(PollError::Empty)
}
