//! Facebook Graph API source: lists a Page's posts since a date.

pub mod error;
pub mod responses;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use self::error::GraphError;
pub use self::responses::Post;
use self::responses::{GraphErrorBody, PostsPage};
use crate::http::HttpSession;
use crate::outcome::{Completeness, Paged};

pub const DEFAULT_GRAPH_ROOT: &str = "https://graph.facebook.com";
pub const DEFAULT_GRAPH_VERSION: &str = "v21.0";
pub const DEFAULT_PAGE_SIZE: u32 = 100;

const POST_FIELDS: &str = "id,created_time";

pub struct GraphClient {
    session: Arc<dyn HttpSession>,
    base_url: String,
    page_id: String,
    access_token: String,
    page_size: u32,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url)
            .field("page_id", &self.page_id)
            .field("access_token", &"<redacted>")
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl GraphClient {
    pub fn new(
        session: Arc<dyn HttpSession>,
        base_url: impl Into<String>,
        page_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            session,
            base_url: base_url.into(),
            page_id: page_id.into(),
            access_token: access_token.into(),
            page_size: DEFAULT_PAGE_SIZE,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Fetch every post created on or after local midnight of `since`.
    ///
    /// Follows `paging.next` until a page comes back empty or without a next
    /// link. Any failure stops pagination; posts already gathered are kept
    /// and the result is tagged [`Completeness::Truncated`].
    pub async fn fetch_posts(&self, since: NaiveDate) -> Paged<Vec<Post>> {
        let mut url = format!("{}/{}/posts", self.base_url, self.page_id);
        let mut query = vec![
            ("access_token", self.access_token.clone()),
            ("fields", POST_FIELDS.to_string()),
            ("since", since_timestamp(since).to_string()),
            ("limit", self.page_size.to_string()),
        ];
        let mut posts: Vec<Post> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_num = 0usize;

        loop {
            if self.shutdown.is_cancelled() {
                warn!(fetched = posts.len(), "Shutdown requested, stopping post fetch");
                return Paged {
                    items: posts,
                    completeness: Completeness::truncated(cursor, "shutdown requested"),
                };
            }

            page_num += 1;
            let page = match self.fetch_page(&url, &query).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(page = page_num, fetched = posts.len(), "Post fetch stopped: {}", e);
                    return Paged {
                        items: posts,
                        completeness: Completeness::truncated(cursor, e),
                    };
                }
            };

            debug!(page = page_num, count = page.data.len(), "Fetched posts page");
            if page.data.is_empty() {
                break;
            }

            let next = page.next_url().map(str::to_owned);
            cursor = page.after_cursor().map(str::to_owned);
            posts.extend(page.data);

            match next {
                Some(next) => {
                    // The next link already carries every query parameter.
                    url = next;
                    query.clear();
                }
                None => break,
            }
        }

        Paged::complete(posts)
    }

    async fn fetch_page(&self, url: &str, query: &[(&str, String)]) -> Result<PostsPage, GraphError> {
        let mut value = self.session.get_json(url, query).await?;
        if let Some(err) = value.get_mut("error").map(Value::take) {
            let body: GraphErrorBody = serde_json::from_value(err)?;
            return Err(GraphError::Api {
                code: body.code,
                message: body.message,
            });
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Unix timestamp of local midnight at the start of `date`.
///
/// Falls back to UTC midnight when local midnight does not exist (DST gap).
pub fn since_timestamp(date: NaiveDate) -> i64 {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    midnight
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| midnight.and_utc().timestamp())
}
