use std::time::Duration;

use chrono::{Local, NaiveDate};

use crate::facebook::DEFAULT_GRAPH_ROOT;
use crate::lark::records::{MAX_BATCH_SIZE, MAX_SEARCH_PAGE_SIZE};
use crate::lark::{BitableLimits, FieldNames, TableRef};
use crate::sync::default_since;
use crate::types::{Domain, LogLevel};

/// Application configuration, resolved and validated from the CLI.
pub struct Config {
    pub page_id: String,
    pub fb_access_token: String,
    pub graph_base: String,
    pub lark_app_id: String,
    pub lark_app_secret: String,
    pub table: TableRef,
    pub fields: FieldNames,
    pub limits: BitableLimits,

    pub since: Option<NaiveDate>,
    pub timeout: Duration,

    pub lookback_days: u32,
    pub fb_page_size: u32,

    pub domain: Domain,
    pub log_level: LogLevel,

    pub dry_run: bool,
    pub auth_only: bool,
    pub strict_exit: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("page_id", &self.page_id)
            .field("fb_access_token", &"<redacted>")
            .field("graph_base", &self.graph_base)
            .field("lark_app_id", &self.lark_app_id)
            .field("lark_app_secret", &"<redacted>")
            .field("table", &self.table)
            .field("domain", &self.domain)
            .field("since", &self.since)
            .field("lookback_days", &self.lookback_days)
            .field("dry_run", &self.dry_run)
            .field("strict_exit", &self.strict_exit)
            .finish_non_exhaustive()
    }
}

fn required(value: Option<String>, flag: &str) -> anyhow::Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => anyhow::bail!("{flag} is required for syncing"),
    }
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        // --auth-only only needs the Lark app credentials.
        let (page_id, fb_access_token, app_token, table_id) = if cli.auth_only {
            (
                cli.page_id.unwrap_or_default(),
                cli.fb_access_token.unwrap_or_default(),
                cli.app_token.unwrap_or_default(),
                cli.table_id.unwrap_or_default(),
            )
        } else {
            (
                required(cli.page_id, "--page-id")?,
                required(cli.fb_access_token, "--fb-access-token")?,
                required(cli.app_token, "--app-token")?,
                required(cli.table_id, "--table-id")?,
            )
        };

        if cli.batch_size == 0 || cli.batch_size > MAX_BATCH_SIZE {
            anyhow::bail!("--batch-size must be between 1 and {MAX_BATCH_SIZE}");
        }
        if cli.search_page_size == 0 || cli.search_page_size > MAX_SEARCH_PAGE_SIZE {
            anyhow::bail!("--search-page-size must be between 1 and {MAX_SEARCH_PAGE_SIZE}");
        }
        if cli.fb_page_size == 0 {
            anyhow::bail!("--fb-page-size must be at least 1");
        }
        if cli.key_field == cli.time_field {
            anyhow::bail!("--key-field and --time-field must name different columns");
        }

        let since = cli.since.as_deref().map(parse_date_or_interval).transpose()?;
        if since.is_none() && default_since(Local::now().date_naive(), cli.days).is_none() {
            anyhow::bail!("--days {} reaches before the earliest supported date", cli.days);
        }

        Ok(Self {
            page_id,
            fb_access_token,
            graph_base: format!("{DEFAULT_GRAPH_ROOT}/{}", cli.graph_version),
            lark_app_id: cli.lark_app_id,
            lark_app_secret: cli.lark_app_secret,
            table: TableRef::new(app_token, table_id),
            fields: FieldNames {
                key: cli.key_field,
                time: cli.time_field,
            },
            limits: BitableLimits {
                search_page_size: cli.search_page_size,
                batch_size: cli.batch_size,
                read_interval: Duration::from_millis(cli.read_interval_ms),
                write_interval: Duration::from_millis(cli.write_interval_ms),
            },
            since,
            timeout: Duration::from_secs(cli.timeout),
            lookback_days: cli.days,
            fb_page_size: cli.fb_page_size,
            domain: cli.domain,
            log_level: cli.log_level,
            dry_run: cli.dry_run,
            auth_only: cli.auth_only,
            strict_exit: cli.strict_exit,
        })
    }
}

/// Parse a start date for the sync window.
///
/// - Relative interval: `"20d"` (20 days before today)
/// - ISO date: `"2025-01-02"`
pub(crate) fn parse_date_or_interval(s: &str) -> anyhow::Result<NaiveDate> {
    if let Some(days_str) = s.strip_suffix('d') {
        if let Ok(days) = days_str.parse::<u32>() {
            return default_since(Local::now().date_naive(), days)
                .ok_or_else(|| anyhow::anyhow!("Interval '{s}' reaches before the earliest supported date"));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    anyhow::bail!(
        "Cannot parse '{}' as a date. Expected ISO date (2025-01-02) or interval (20d)",
        s
    )
}
