//! Reconciliation engine: diff source posts against the Bitable table by
//! natural key and drive the minimal set of creates and updates.
//!
//! A run is linear: fetch posts → authenticate → index existing records →
//! partition → write creates → write updates → report. Nothing is persisted
//! between runs; every run re-reads the whole table.

mod plan;

pub use plan::plan;

use chrono::{Days, Local, NaiveDate};
use tracing::{error, info, warn};

use crate::facebook::{GraphClient, Post};
use crate::lark::error::AuthError;
use crate::lark::{Bitable, LarkAuth, TableRef, TenantToken};
use crate::outcome::{Completeness, RunStatus};

pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Per-run state handed explicitly through the reconciler.
///
/// Holds the tenant token once acquired; it is never refreshed.
#[derive(Debug, Default)]
pub struct RunContext {
    token: Option<TenantToken>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token, exchanging credentials on first use.
    pub async fn credential(&mut self, auth: &LarkAuth) -> Result<&TenantToken, AuthError> {
        let token = match self.token.take() {
            Some(token) => token,
            None => auth.tenant_access_token().await?,
        };
        Ok(self.token.insert(token))
    }

    #[cfg(test)]
    pub fn has_credential(&self) -> bool {
        self.token.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertReport {
    /// Records the destination acknowledged as created.
    pub created: usize,
    /// Records the destination acknowledged as updated.
    pub updated: usize,
    pub planned_creates: usize,
    pub planned_updates: usize,
    pub status: RunStatus,
}

impl UpsertReport {
    fn failed(reason: String) -> Self {
        Self {
            created: 0,
            updated: 0,
            planned_creates: 0,
            planned_updates: 0,
            status: RunStatus::Failed(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub since: NaiveDate,
    pub fetched: usize,
    pub source: Completeness,
    /// `None` when there was nothing to upsert.
    pub upsert: Option<UpsertReport>,
    pub status: RunStatus,
}

impl SyncReport {
    pub fn created(&self) -> usize {
        self.upsert.as_ref().map_or(0, |u| u.created)
    }

    pub fn updated(&self) -> usize {
        self.upsert.as_ref().map_or(0, |u| u.updated)
    }
}

/// Start of the default window: `lookback_days` before `today`, or `None`
/// when that falls outside the representable calendar.
pub fn default_since(today: NaiveDate, lookback_days: u32) -> Option<NaiveDate> {
    today.checked_sub_days(Days::new(u64::from(lookback_days)))
}

pub struct Reconciler {
    source: GraphClient,
    auth: LarkAuth,
    bitable: Bitable,
    dry_run: bool,
}

impl Reconciler {
    pub fn new(source: GraphClient, auth: LarkAuth, bitable: Bitable) -> Self {
        Self {
            source,
            auth,
            bitable,
            dry_run: false,
        }
    }

    /// Compute and log the plan without writing anything.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[cfg(test)]
    pub fn auth(&self) -> &LarkAuth {
        &self.auth
    }

    /// Create posts missing from `table` and refresh the ones present.
    ///
    /// Counts in the report are what the destination acknowledged. An
    /// incomplete listing of existing records aborts before any write, since
    /// treating unseen records as absent would create duplicates.
    pub async fn upsert(&self, ctx: &mut RunContext, table: &TableRef, posts: &[Post]) -> UpsertReport {
        let token = match ctx.credential(&self.auth).await {
            Ok(token) => token,
            Err(e) => {
                error!("Lark authentication failed: {}", e);
                return UpsertReport::failed(format!("authentication failed: {e}"));
            }
        };

        let existing = self.bitable.list_existing(token, table).await;
        if !existing.completeness.is_complete() {
            error!(
                indexed = existing.items.len(),
                "Existing record listing is incomplete, refusing to write: {}",
                existing.completeness
            );
            return UpsertReport::failed(format!(
                "existing records listing {}",
                existing.completeness
            ));
        }
        info!(existing = existing.items.len(), table = %table, "Indexed existing records");

        let plan = plan(&existing.items, posts, self.bitable.fields());
        info!(
            create = plan.creates.len(),
            update = plan.updates.len(),
            "Computed upsert plan"
        );

        let mut report = UpsertReport {
            created: 0,
            updated: 0,
            planned_creates: plan.creates.len(),
            planned_updates: plan.updates.len(),
            status: RunStatus::Complete,
        };
        if self.dry_run {
            info!("Dry run, skipping writes");
            return report;
        }

        let created = self.bitable.create(token, table, &plan.creates).await;
        let updated = self.bitable.update(token, table, &plan.updates).await;
        report.created = created.written;
        report.updated = updated.written;

        info!(
            created = created.written,
            updated = updated.written,
            batches = created.batches + updated.batches,
            "Writes finished"
        );

        let unacknowledged = created.failed_records() + updated.failed_records();
        let mut failures = created.failures.iter().chain(&updated.failures);
        if let Some(first) = failures.next() {
            let failed_batches = 1 + failures.count();
            warn!(unacknowledged, failed_batches, "Some batches were not acknowledged");
            report.status = RunStatus::Partial(format!(
                "{unacknowledged} of {} records not acknowledged in {failed_batches} batch(es), \
                 first at batch {}: {}",
                posts.len(),
                first.batch,
                first.cause
            ));
        }
        report
    }

    /// One-shot sync of posts created since `since`, or over the last
    /// `lookback_days` when no date is given.
    pub async fn sync(&self, table: &TableRef, since: Option<NaiveDate>, lookback_days: u32) -> SyncReport {
        let today = Local::now().date_naive();
        let Some(since) = since.or_else(|| default_since(today, lookback_days)) else {
            error!(lookback_days, "Lookback window starts before the earliest supported date");
            return SyncReport {
                since: today,
                fetched: 0,
                source: Completeness::Complete,
                upsert: None,
                status: RunStatus::Failed(format!("lookback of {lookback_days} days is out of range")),
            };
        };
        info!(%since, lookback_days, "Starting sync");

        let fetched = self.source.fetch_posts(since).await;
        let source = fetched.completeness;
        let posts = fetched.items;

        if posts.is_empty() {
            info!("No posts to sync");
            let status = match &source {
                Completeness::Complete => RunStatus::Complete,
                truncated => RunStatus::Failed(format!("post fetch {truncated}")),
            };
            return SyncReport {
                since,
                fetched: 0,
                source,
                upsert: None,
                status,
            };
        }
        info!(count = posts.len(), "Fetched posts");

        let mut ctx = RunContext::new();
        let upsert = self.upsert(&mut ctx, table, &posts).await;

        let status = match (&source, &upsert.status) {
            (_, RunStatus::Failed(reason)) => RunStatus::Failed(reason.clone()),
            (Completeness::Truncated { .. }, RunStatus::Partial(reason)) => {
                RunStatus::Partial(format!("post fetch {source}; {reason}"))
            }
            (Completeness::Truncated { .. }, RunStatus::Complete) => {
                RunStatus::Partial(format!("post fetch {source}"))
            }
            (Completeness::Complete, status) => status.clone(),
        };

        SyncReport {
            since,
            fetched: posts.len(),
            source,
            upsert: Some(upsert),
            status,
        }
    }
}
