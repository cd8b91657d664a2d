use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::error::BitableError;

/// Response from `/auth/v3/tenant_access_token/internal`.
#[derive(Debug, Deserialize)]
pub struct TenantTokenResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub tenant_access_token: Option<String>,
    /// Lifetime in seconds. Informational only; tokens are never refreshed.
    #[serde(default)]
    pub expire: Option<u64>,
}

/// `code`/`msg` pair present on every open-platform response.
#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

/// `data` of `records/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub items: Vec<RecordItem>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// A Bitable record. Field values are dynamic: text columns come back as
/// lists of `{text, type}` segments, numbers and dates as scalars.
#[derive(Debug, Deserialize)]
pub struct RecordItem {
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Check `code` and decode `data`. A missing or null `data` decodes as `{}`.
pub fn into_data<T: DeserializeOwned>(mut value: Value) -> Result<T, BitableError> {
    let status: ApiStatus = serde_json::from_value(value.clone())?;
    if status.code != 0 {
        return Err(BitableError::Api {
            code: status.code,
            msg: status.msg,
        });
    }
    let data = match value.get_mut("data").map(Value::take) {
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(data) => data,
    };
    Ok(serde_json::from_value(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_response_success() {
        let json = r#"{"code":0,"msg":"ok","tenant_access_token":"t-abc","expire":7200}"#;
        let resp: TenantTokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.code, 0);
        assert_eq!(resp.tenant_access_token.as_deref(), Some("t-abc"));
        assert_eq!(resp.expire, Some(7200));
    }

    #[test]
    fn test_token_response_failure() {
        let json = r#"{"code":10003,"msg":"invalid param"}"#;
        let resp: TenantTokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.code, 10003);
        assert!(resp.tenant_access_token.is_none());
    }

    #[test]
    fn test_search_data_decodes() {
        let value = json!({
            "code": 0,
            "msg": "success",
            "data": {
                "has_more": true,
                "page_token": "p2",
                "total": 3,
                "items": [
                    {"record_id": "rec1", "fields": {"Post ID": [{"text": "A", "type": "text"}]}},
                    {"record_id": "rec2", "fields": {}}
                ]
            }
        });
        let data: SearchData = into_data(value).unwrap();
        assert!(data.has_more);
        assert_eq!(data.page_token.as_deref(), Some("p2"));
        assert_eq!(data.items.len(), 2);
        assert_eq!(data.items[0].record_id.as_deref(), Some("rec1"));
        assert!(data.items[1].fields.is_empty());
    }

    #[test]
    fn test_into_data_nonzero_code() {
        let value = json!({"code": 1254045, "msg": "FieldNameNotFound", "data": {}});
        let err = into_data::<SearchData>(value).unwrap_err();
        match err {
            BitableError::Api { code, msg } => {
                assert_eq!(code, 1254045);
                assert_eq!(msg, "FieldNameNotFound");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_into_data_missing_data() {
        let data: SearchData = into_data(json!({"code": 0})).unwrap();
        assert!(data.items.is_empty());
        assert!(!data.has_more);
    }
}
