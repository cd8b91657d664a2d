//! Tenant access token exchange.

use std::sync::Arc;

use serde_json::json;

use super::endpoints::Endpoints;
use super::error::AuthError;
use super::responses::TenantTokenResponse;
use crate::http::HttpSession;

/// Bearer credential for Bitable calls. Lives for one run.
#[derive(Clone, PartialEq, Eq)]
pub struct TenantToken(String);

impl TenantToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for TenantToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TenantToken(<redacted>)")
    }
}

pub struct LarkAuth {
    session: Arc<dyn HttpSession>,
    endpoints: Endpoints,
    app_id: String,
    app_secret: String,
}

impl std::fmt::Debug for LarkAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LarkAuth")
            .field("endpoints", &self.endpoints)
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

impl LarkAuth {
    pub fn new(
        session: Arc<dyn HttpSession>,
        endpoints: Endpoints,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        Self {
            session,
            endpoints,
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Exchange the app id and secret for a tenant token. Single attempt.
    pub async fn tenant_access_token(&self) -> Result<TenantToken, AuthError> {
        let body = json!({
            "app_id": self.app_id,
            "app_secret": self.app_secret,
        });
        let value = self
            .session
            .post_json(&self.endpoints.tenant_access_token(), &body, None)
            .await?;
        let resp: TenantTokenResponse = serde_json::from_value(value)?;

        if resp.code != 0 {
            return Err(AuthError::Rejected {
                code: resp.code,
                msg: resp.msg,
            });
        }
        let token = resp
            .tenant_access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        tracing::debug!(expire_secs = ?resp.expire, "Obtained tenant access token");
        Ok(TenantToken::new(token))
    }
}
