use clap::Parser;

use crate::facebook::DEFAULT_GRAPH_VERSION;
use crate::sync::DEFAULT_LOOKBACK_DAYS;
use crate::types::{Domain, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "fb-lark-sync",
    version,
    about = "Upsert Facebook Page posts into a Lark Bitable table"
)]
pub struct Cli {
    /// Facebook Page id
    #[arg(long, env = "FB_PAGE_ID")]
    pub page_id: Option<String>,

    /// Page access token.
    /// WARNING: passing via --fb-access-token is visible in process listings.
    /// Prefer the FB_ACCESS_TOKEN environment variable instead.
    #[arg(long, env = "FB_ACCESS_TOKEN", hide_env_values = true)]
    pub fb_access_token: Option<String>,

    /// Graph API version
    #[arg(long, default_value = DEFAULT_GRAPH_VERSION)]
    pub graph_version: String,

    /// Lark app id (cli_...)
    #[arg(long, env = "LARK_APP_ID")]
    pub lark_app_id: String,

    /// Lark app secret. Prefer the LARK_APP_SECRET environment variable.
    #[arg(long, env = "LARK_APP_SECRET", hide_env_values = true)]
    pub lark_app_secret: String,

    /// Bitable base token (the app token in the base URL)
    #[arg(long, env = "LARK_APP_TOKEN")]
    pub app_token: Option<String>,

    /// Bitable table id (tbl...)
    #[arg(long, env = "LARK_TABLE_ID")]
    pub table_id: Option<String>,

    /// Lark deployment
    #[arg(long, value_enum, default_value = "feishu")]
    pub domain: Domain,

    /// Sync posts created on or after this ISO date or interval (e.g., 2025-01-02 or 20d)
    #[arg(long)]
    pub since: Option<String>,

    /// Lookback window in days when --since is not given
    #[arg(long, default_value_t = DEFAULT_LOOKBACK_DAYS)]
    pub days: u32,

    /// Table column holding the post id
    #[arg(long, default_value = "Post ID")]
    pub key_field: String,

    /// Table column receiving the post creation time (epoch milliseconds)
    #[arg(long, default_value = "Thời gian đăng")]
    pub time_field: String,

    /// Posts requested per Graph API page
    #[arg(long, default_value_t = 100)]
    pub fb_page_size: u32,

    /// Records requested per Bitable search page (max 500)
    #[arg(long, default_value_t = 500)]
    pub search_page_size: u32,

    /// Records per batch create/update call (max 500)
    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Minimum milliseconds between Bitable search pages
    #[arg(long, default_value_t = 300)]
    pub read_interval_ms: u64,

    /// Minimum milliseconds between Bitable write batches
    #[arg(long, default_value_t = 500)]
    pub write_interval_ms: u64,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Fetch and diff, but do not write to the table
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with status 1 when the sync is partial or failed
    /// (default: always exit 0 and report the status in the summary)
    #[arg(long)]
    pub strict_exit: bool,

    /// Only check the Lark credentials
    #[arg(long)]
    pub auth_only: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}
