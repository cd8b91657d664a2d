//! Bitable record reads and batched writes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::auth::TenantToken;
use super::endpoints::Endpoints;
use super::error::BitableError;
use super::fields::{extract_key, FieldNames};
use super::responses::{into_data, SearchData};
use super::TableRef;
use crate::facebook::Post;
use crate::http::HttpSession;
use crate::outcome::{BatchFailure, Completeness, Paged, WriteOutcome};
use crate::pacing::Pacer;

/// Largest `page_size` accepted by `records/search`.
pub const MAX_SEARCH_PAGE_SIZE: u32 = 500;
/// Largest record count accepted by `batch_create` / `batch_update`.
pub const MAX_BATCH_SIZE: usize = 500;

pub const DEFAULT_SEARCH_PAGE_SIZE: u32 = 500;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_READ_INTERVAL: Duration = Duration::from_millis(300);
pub const DEFAULT_WRITE_INTERVAL: Duration = Duration::from_millis(500);

/// Natural key to record id, as seen at the start of a run.
pub type KeyIndex = HashMap<String, String>;

/// An existing record to overwrite with freshly computed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub record_id: String,
    pub fields: Map<String, Value>,
}

/// Limits applied to Bitable traffic.
#[derive(Debug, Clone)]
pub struct BitableLimits {
    pub search_page_size: u32,
    pub batch_size: usize,
    pub read_interval: Duration,
    pub write_interval: Duration,
}

impl Default for BitableLimits {
    fn default() -> Self {
        Self {
            search_page_size: DEFAULT_SEARCH_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            read_interval: DEFAULT_READ_INTERVAL,
            write_interval: DEFAULT_WRITE_INTERVAL,
        }
    }
}

pub struct Bitable {
    session: Arc<dyn HttpSession>,
    endpoints: Endpoints,
    fields: FieldNames,
    search_page_size: u32,
    batch_size: usize,
    read_pacer: Pacer,
    write_pacer: Pacer,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for Bitable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitable")
            .field("endpoints", &self.endpoints)
            .field("fields", &self.fields)
            .field("search_page_size", &self.search_page_size)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Bitable {
    pub fn new(
        session: Arc<dyn HttpSession>,
        endpoints: Endpoints,
        fields: FieldNames,
        limits: BitableLimits,
    ) -> Self {
        Self {
            session,
            endpoints,
            fields,
            search_page_size: limits.search_page_size.clamp(1, MAX_SEARCH_PAGE_SIZE),
            batch_size: limits.batch_size.clamp(1, MAX_BATCH_SIZE),
            read_pacer: Pacer::new(limits.read_interval),
            write_pacer: Pacer::new(limits.write_interval),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn fields(&self) -> &FieldNames {
        &self.fields
    }

    /// Page through every record and index it by natural key.
    ///
    /// Records without a key or record id are skipped; on duplicate keys the
    /// record seen last wins. A failed page stops pagination and the partial
    /// index comes back tagged [`Completeness::Truncated`].
    pub async fn list_existing(&self, token: &TenantToken, table: &TableRef) -> Paged<KeyIndex> {
        let url = self.endpoints.records(table, "search");
        let mut index = KeyIndex::new();
        let mut page_token: Option<String> = None;
        let mut page_num = 0usize;

        loop {
            if self.shutdown.is_cancelled() {
                return Paged {
                    items: index,
                    completeness: Completeness::truncated(page_token, "shutdown requested"),
                };
            }

            let mut body = json!({
                "page_size": self.search_page_size,
                "field_names": [self.fields.key],
            });
            if let Some(t) = &page_token {
                body["page_token"] = Value::String(t.clone());
            }

            self.read_pacer.pace().await;
            page_num += 1;
            let data: SearchData = match self.call(&url, &body, token).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(page = page_num, indexed = index.len(), "Record listing stopped: {}", e);
                    return Paged {
                        items: index,
                        completeness: Completeness::truncated(page_token, e),
                    };
                }
            };

            debug!(
                page = page_num,
                count = data.items.len(),
                total = ?data.total,
                "Fetched records page"
            );
            for item in data.items {
                let key = extract_key(item.fields.get(&self.fields.key));
                let record_id = item.record_id.filter(|id| !id.is_empty());
                if let (Some(key), Some(record_id)) = (key, record_id) {
                    if let Some(previous) = index.insert(key.clone(), record_id) {
                        debug!(key = %key, previous = %previous, "Duplicate key in table, keeping later record");
                    }
                }
            }

            if !data.has_more {
                break;
            }
            match data.page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => {
                    return Paged {
                        items: index,
                        completeness: Completeness::truncated(
                            page_token,
                            "has_more set without a page_token",
                        ),
                    };
                }
            }
        }

        Paged::complete(index)
    }

    /// Create one record per post, in batches.
    pub async fn create(&self, token: &TenantToken, table: &TableRef, posts: &[Post]) -> WriteOutcome {
        let records: Vec<Value> = posts
            .iter()
            .map(|post| json!({ "fields": self.fields.record_fields(post) }))
            .collect();
        let url = self.endpoints.records(table, "batch_create");
        self.write_batches(token, &url, "create", records).await
    }

    /// Overwrite fields of existing records, in batches.
    /// An empty `updates` issues no request.
    pub async fn update(
        &self,
        token: &TenantToken,
        table: &TableRef,
        updates: &[RecordUpdate],
    ) -> WriteOutcome {
        if updates.is_empty() {
            return WriteOutcome::default();
        }
        let records: Vec<Value> = updates
            .iter()
            .map(|u| json!({ "record_id": u.record_id, "fields": u.fields }))
            .collect();
        let url = self.endpoints.records(table, "batch_update");
        self.write_batches(token, &url, "update", records).await
    }

    /// Submit `records` in chunks of `batch_size`, one attempt each.
    /// Failed batches are recorded and skipped.
    async fn write_batches(
        &self,
        token: &TenantToken,
        url: &str,
        op: &'static str,
        records: Vec<Value>,
    ) -> WriteOutcome {
        let mut outcome = WriteOutcome::default();
        let total = records.len();

        for (batch, chunk) in records.chunks(self.batch_size).enumerate() {
            if self.shutdown.is_cancelled() {
                let done = batch * self.batch_size;
                warn!(op, batch, remaining = total - done, "Shutdown requested, skipping remaining batches");
                outcome.failures.push(BatchFailure {
                    batch,
                    size: total - done,
                    cause: "shutdown requested".to_string(),
                });
                break;
            }

            // A fresh client_token per batch lets Lark drop a replayed create.
            let batch_url = if op == "create" {
                format!("{url}?client_token={}", Uuid::new_v4())
            } else {
                url.to_string()
            };
            let body = json!({ "records": chunk });

            self.write_pacer.pace().await;
            outcome.batches += 1;
            match self.call::<IgnoredAny>(&batch_url, &body, token).await {
                Ok(_) => {
                    outcome.written += chunk.len();
                    debug!(op, batch, size = chunk.len(), "Batch acknowledged");
                }
                Err(e) => {
                    warn!(op, batch, size = chunk.len(), "Batch failed: {}", e);
                    outcome.failures.push(BatchFailure {
                        batch,
                        size: chunk.len(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        outcome
    }

    async fn call<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &Value,
        token: &TenantToken,
    ) -> Result<T, BitableError> {
        let value = self
            .session
            .post_json(url, body, Some(token.as_str()))
            .await?;
        into_data(value)
    }
}
