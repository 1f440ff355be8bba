//! Document store boundary.
//!
//! The directory talks to persistence only through [`DirectoryStore`]. Queries
//! are described by immutable filter values so the same criteria can drive a
//! page fetch and its total count.

mod memory;
mod postgres;

use async_trait::async_trait;
use threads_shared::{api::SortDirection, Community, Thread, User};
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid query: {0}")]
    Query(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Criteria for user lookups. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    ids: Option<Vec<Uuid>>,
    excluded_external_id: Option<String>,
    search: Option<String>,
}

impl UserFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only users whose id is in `ids`.
    pub fn with_ids(self, ids: Vec<Uuid>) -> Self {
        Self {
            ids: Some(ids),
            ..self
        }
    }

    pub fn excluding(self, external_id: impl Into<String>) -> Self {
        Self {
            excluded_external_id: Some(external_id.into()),
            ..self
        }
    }

    /// Case-insensitive substring match on username or display name.
    /// Blank terms leave the filter unchanged. Surrounding whitespace in a
    /// non-blank term is part of the match.
    pub fn matching(self, term: &str) -> Self {
        match normalize_term(term) {
            Some(term) => Self {
                search: Some(term),
                ..self
            },
            None => self,
        }
    }

    pub fn ids(&self) -> Option<&[Uuid]> {
        self.ids.as_deref()
    }

    pub fn excluded_external_id(&self) -> Option<&str> {
        self.excluded_external_id.as_deref()
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadFilter {
    ids: Option<Vec<Uuid>>,
    author_id: Option<Uuid>,
    excluded_author_id: Option<Uuid>,
}

impl ThreadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(self, ids: Vec<Uuid>) -> Self {
        Self {
            ids: Some(ids),
            ..self
        }
    }

    pub fn authored_by(self, author_id: Uuid) -> Self {
        Self {
            author_id: Some(author_id),
            ..self
        }
    }

    pub fn not_authored_by(self, author_id: Uuid) -> Self {
        Self {
            excluded_author_id: Some(author_id),
            ..self
        }
    }

    pub fn ids(&self) -> Option<&[Uuid]> {
        self.ids.as_deref()
    }

    pub fn author_id(&self) -> Option<Uuid> {
        self.author_id
    }

    pub fn excluded_author_id(&self) -> Option<Uuid> {
        self.excluded_author_id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommunityFilter {
    search: Option<String>,
}

impl CommunityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring match on name or username.
    pub fn matching(self, term: &str) -> Self {
        Self {
            search: normalize_term(term),
        }
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }
}

/// Blank terms mean "no search"; anything else is kept as typed.
fn normalize_term(term: &str) -> Option<String> {
    (!term.trim().is_empty()).then(|| term.to_string())
}

/// Ordering and window for list queries. Results are ordered by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: SortDirection,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            sort: SortDirection::Asc,
            skip: 0,
            limit: None,
        }
    }
}

impl FindOptions {
    pub fn page(sort: SortDirection, skip: u64, limit: u64) -> Self {
        Self {
            sort,
            skip,
            limit: Some(limit),
        }
    }
}

/// Fields written by a profile upsert. `username` is already lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpsert {
    pub external_id: String,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThread {
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub body: String,
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Finds the user with the given identity-provider id.
    async fn find_user(&self, external_id: &str) -> StoreResult<Option<User>>;

    async fn find_users(&self, filter: &UserFilter, options: &FindOptions)
        -> StoreResult<Vec<User>>;

    /// Counts users matching `filter`, ignoring any window.
    async fn count_users(&self, filter: &UserFilter) -> StoreResult<u64>;

    /// Updates the user matching `external_id` or inserts it. Either way the
    /// user ends up onboarded.
    async fn upsert_user(&self, upsert: &UserUpsert) -> StoreResult<()>;

    async fn find_threads(&self, filter: &ThreadFilter) -> StoreResult<Vec<Thread>>;

    async fn insert_thread(&self, thread: &NewThread) -> StoreResult<Thread>;

    async fn append_user_thread(&self, user_id: Uuid, thread_id: Uuid) -> StoreResult<()>;

    /// Links `child_id` as a reply of `parent_id`. Already linked children are
    /// not added twice.
    async fn append_thread_child(&self, parent_id: Uuid, child_id: Uuid) -> StoreResult<()>;

    async fn find_communities(
        &self,
        filter: &CommunityFilter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Community>>;

    async fn count_communities(&self, filter: &CommunityFilter) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_search_terms_are_dropped() {
        let filter = UserFilter::new().excluding("u1").matching("   ");
        assert_eq!(filter.search(), None);
        assert_eq!(filter.excluded_external_id(), Some("u1"));

        let filter = CommunityFilter::new().matching("");
        assert_eq!(filter, CommunityFilter::new());
    }

    #[test]
    fn search_terms_are_kept_as_typed() {
        let filter = UserFilter::new().matching("  Ali ");
        assert_eq!(filter.search(), Some("  Ali "));

        let filter = CommunityFilter::new().matching("rust ");
        assert_eq!(filter.search(), Some("rust "));
    }

    #[test]
    fn builders_keep_earlier_criteria() {
        let author = Uuid::new_v4();
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        let filter = ThreadFilter::new()
            .with_ids(ids.clone())
            .not_authored_by(author);

        assert_eq!(filter.ids(), Some(ids.as_slice()));
        assert_eq!(filter.excluded_author_id(), Some(author));
        assert_eq!(filter.author_id(), None);
    }
}
