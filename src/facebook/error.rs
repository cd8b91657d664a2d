use thiserror::Error;

use crate::http::TransportError;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Graph API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
