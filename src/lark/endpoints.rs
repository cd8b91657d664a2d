//! Open-platform base URLs for the two Lark deployments.
//! "feishu" serves mainland China, "lark" serves everyone else.

use crate::types::Domain;

use super::TableRef;

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub base: String,
}

impl Endpoints {
    pub fn for_domain(domain: Domain) -> Self {
        let base = match domain {
            Domain::Feishu => "https://open.feishu.cn/open-apis",
            Domain::Lark => "https://open.larksuite.com/open-apis",
        };
        Self::with_base(base)
    }

    /// Endpoints rooted at an arbitrary base, e.g. a proxy or a test server.
    pub fn with_base(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }

    pub fn tenant_access_token(&self) -> String {
        format!("{}/auth/v3/tenant_access_token/internal", self.base)
    }

    /// `action` is one of `search`, `batch_create`, `batch_update`.
    pub fn records(&self, table: &TableRef, action: &str) -> String {
        format!(
            "{}/bitable/v1/apps/{}/tables/{}/records/{}",
            self.base, table.app_token, table.table_id, action
        )
    }
}
