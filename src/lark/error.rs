use thiserror::Error;

use crate::http::TransportError;

/// Tenant token exchange failures. Always fatal for a run.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token request rejected (code {code}): {msg}")]
    Rejected { code: i64, msg: String },

    #[error("Token response carried no tenant_access_token")]
    MissingToken,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A single Bitable call that did not succeed.
#[derive(Debug, Error)]
pub enum BitableError {
    #[error("Bitable API error (code {code}): {msg}")]
    Api { code: i64, msg: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
