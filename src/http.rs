//! Thin JSON-over-HTTP abstraction shared by the Graph and Lark clients.
//!
//! Both remote APIs speak JSON and only need GET with query parameters and
//! POST with a JSON body, so the clients talk to a [`HttpSession`] instead of
//! `reqwest` directly. Tests swap in an in-memory implementation.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

const USER_AGENT: &str = concat!("fb-lark-sync/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in a [`TransportError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait HttpSession: Send + Sync {
    /// GET `url` with extra query parameters and decode the JSON body.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, TransportError>;

    /// POST `body` as JSON to `url`, optionally with a bearer token.
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<Value, TransportError>;
}

/// Build the shared `reqwest` client used for every remote call.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, TransportError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

async fn decode(resp: reqwest::Response) -> Result<Value, TransportError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        let body = match text.char_indices().nth(MAX_ERROR_BODY) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text,
        };
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&text)?)
}

#[async_trait::async_trait]
impl HttpSession for reqwest::Client {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, TransportError> {
        let resp = reqwest::Client::get(self, url).query(query).send().await?;
        decode(resp).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<Value, TransportError> {
        let mut builder = reqwest::Client::post(self, url).json(body);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        decode(builder.send().await?).await
    }
}
