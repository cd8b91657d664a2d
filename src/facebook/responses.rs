use serde::Deserialize;

/// One page of `/{page-id}/posts`.
#[derive(Debug, Deserialize)]
pub struct PostsPage {
    #[serde(default)]
    pub data: Vec<Post>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

/// A Page post as requested with `fields=id,created_time`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Post {
    pub id: String,
    /// Raw Graph timestamp, e.g. `2024-01-01T10:00:00+0000`.
    #[serde(default)]
    pub created_time: String,
}

#[derive(Debug, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub cursors: Option<Cursors>,
}

#[derive(Debug, Deserialize)]
pub struct Cursors {
    #[serde(default)]
    pub after: Option<String>,
}

/// Error object the Graph API embeds in failed responses.
#[derive(Debug, Deserialize)]
pub struct GraphErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i64,
}

impl PostsPage {
    pub fn next_url(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_deref())
            .filter(|n| !n.is_empty())
    }

    pub fn after_cursor(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.cursors.as_ref())
            .and_then(|c| c.after.as_deref())
    }
}
