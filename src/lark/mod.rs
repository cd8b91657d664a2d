//! Lark (Feishu) open platform: tenant auth plus Bitable record access.

pub mod auth;
pub mod endpoints;
pub mod error;
pub mod fields;
pub mod records;
pub mod responses;

pub use auth::{LarkAuth, TenantToken};
pub use endpoints::Endpoints;
pub use fields::FieldNames;
pub use records::{Bitable, BitableLimits, KeyIndex, RecordUpdate};

/// A Bitable table: the base (`app_token`) and the table inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub app_token: String,
    pub table_id: String,
}

impl TableRef {
    pub fn new(app_token: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            app_token: app_token.into(),
            table_id: table_id.into(),
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.app_token, self.table_id)
    }
}
