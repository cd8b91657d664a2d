//! Mapping between posts and Bitable record fields.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::facebook::Post;

pub const DEFAULT_KEY_FIELD: &str = "Post ID";
pub const DEFAULT_TIME_FIELD: &str = "Thời gian đăng";

/// Graph API timestamps look like `2024-01-01T10:00:00+0000`.
const GRAPH_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Column names in the destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    pub key: String,
    pub time: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY_FIELD.to_string(),
            time: DEFAULT_TIME_FIELD.to_string(),
        }
    }
}

impl FieldNames {
    /// Fields written for `post`, on create and on update alike.
    pub fn record_fields(&self, post: &Post) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(self.key.clone(), Value::String(post.id.clone()));
        fields.insert(
            self.time.clone(),
            Value::from(created_time_millis(&post.created_time)),
        );
        fields
    }
}

/// Epoch milliseconds for a Graph `created_time`.
///
/// Unparseable input maps to the current time instead of failing the batch.
pub fn created_time_millis(raw: &str) -> i64 {
    match DateTime::parse_from_str(raw, GRAPH_TIME_FORMAT) {
        Ok(dt) => dt.timestamp_millis(),
        Err(e) => {
            tracing::debug!(created_time = raw, "Unparseable created_time, using now: {}", e);
            Utc::now().timestamp_millis()
        }
    }
}

/// Read the natural key out of a stored field value.
///
/// Bitable returns text columns as `[{"text": "...", "type": "text"}]`, but
/// older rows and other column types store a bare scalar, a single wrapped
/// object, or a list of scalars. Only the first list element is considered.
pub fn extract_key(value: Option<&Value>) -> Option<String> {
    let key = match value? {
        Value::Array(items) => match items.first()? {
            Value::Object(obj) => text_of(obj),
            other => scalar_to_string(other),
        },
        Value::Object(obj) => text_of(obj),
        other => scalar_to_string(other),
    }?;
    (!key.is_empty()).then_some(key)
}

fn text_of(obj: &Map<String, Value>) -> Option<String> {
    obj.get("text").and_then(scalar_to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
