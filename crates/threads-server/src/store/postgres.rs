use async_trait::async_trait;
use threads_shared::{api::SortDirection, Community, Thread, User};
use uuid::Uuid;

use super::{
    CommunityFilter, DirectoryStore, FindOptions, NewThread, StoreError, StoreResult,
    ThreadFilter, UserFilter, UserUpsert,
};
use crate::db::DbPool;

const USER_COLUMNS: &str =
    "id, external_id, username, display_name, bio, image_url, onboarded, threads, created_at";

// $1 ids, $2 excluded external id, $3 ILIKE pattern
const USER_WHERE: &str = r#"
    WHERE ($1::uuid[] IS NULL OR id = ANY($1))
      AND ($2::text IS NULL OR external_id <> $2)
      AND ($3::text IS NULL OR username ILIKE $3 OR display_name ILIKE $3)
"#;

const THREAD_COLUMNS: &str = "id, author_id, parent_id, body, children, created_at";

const COMMUNITY_COLUMNS: &str = "id, name, username, image_url, bio, members, created_at";

// $1 ILIKE pattern
const COMMUNITY_WHERE: &str = r#"
    WHERE ($1::text IS NULL OR name ILIKE $1 OR username ILIKE $1)
"#;

/// PostgreSQL-backed store. Reference lists live in `uuid[]` columns so each
/// row reads like the document it stands for.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Turns a search term into an ILIKE pattern matching it as a literal substring.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Creation time first, then id, so rows created in the same instant still
/// page deterministically.
fn order_by(sort: SortDirection) -> &'static str {
    match sort {
        SortDirection::Asc => "ORDER BY created_at ASC, id ASC",
        SortDirection::Desc => "ORDER BY created_at DESC, id DESC",
    }
}

fn window(options: &FindOptions) -> (Option<i64>, i64) {
    let limit = options.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset = i64::try_from(options.skip).unwrap_or(i64::MAX);
    (limit, offset)
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn find_user(&self, external_id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_users(
        &self,
        filter: &UserFilter,
        options: &FindOptions,
    ) -> StoreResult<Vec<User>> {
        let (limit, offset) = window(options);
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users {USER_WHERE} {} LIMIT $4 OFFSET $5",
            order_by(options.sort)
        );

        let users = sqlx::query_as::<_, User>(&sql)
            .bind(filter.ids())
            .bind(filter.excluded_external_id())
            .bind(filter.search().map(like_pattern))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn count_users(&self, filter: &UserFilter) -> StoreResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM users {USER_WHERE}");
        let (total,): (i64,) = sqlx::query_as(&sql)
            .bind(filter.ids())
            .bind(filter.excluded_external_id())
            .bind(filter.search().map(like_pattern))
            .fetch_one(&self.pool)
            .await?;

        Ok(total.max(0) as u64)
    }

    async fn upsert_user(&self, upsert: &UserUpsert) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, external_id, username, display_name, bio, image_url, onboarded)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            ON CONFLICT (external_id) DO UPDATE
            SET username = EXCLUDED.username,
                display_name = EXCLUDED.display_name,
                bio = EXCLUDED.bio,
                image_url = EXCLUDED.image_url,
                onboarded = TRUE
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&upsert.external_id)
        .bind(&upsert.username)
        .bind(&upsert.display_name)
        .bind(&upsert.bio)
        .bind(&upsert.image_url)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn find_threads(&self, filter: &ThreadFilter) -> StoreResult<Vec<Thread>> {
        let sql = format!(
            r#"
            SELECT {THREAD_COLUMNS} FROM threads
            WHERE ($1::uuid[] IS NULL OR id = ANY($1))
              AND ($2::uuid IS NULL OR author_id = $2)
              AND ($3::uuid IS NULL OR author_id <> $3)
            ORDER BY created_at ASC, id ASC
            "#
        );

        let threads = sqlx::query_as::<_, Thread>(&sql)
            .bind(filter.ids())
            .bind(filter.author_id())
            .bind(filter.excluded_author_id())
            .fetch_all(&self.pool)
            .await?;

        Ok(threads)
    }

    async fn insert_thread(&self, thread: &NewThread) -> StoreResult<Thread> {
        let sql = format!(
            r#"
            INSERT INTO threads (id, author_id, parent_id, body)
            VALUES ($1, $2, $3, $4)
            RETURNING {THREAD_COLUMNS}
            "#
        );

        let thread = sqlx::query_as::<_, Thread>(&sql)
            .bind(Uuid::new_v4())
            .bind(thread.author_id)
            .bind(thread.parent_id)
            .bind(&thread.body)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        Ok(thread)
    }

    async fn append_user_thread(&self, user_id: Uuid, thread_id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE users SET threads = array_append(threads, $2) WHERE id = $1")
            .bind(user_id)
            .bind(thread_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn append_thread_child(&self, parent_id: Uuid, child_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE threads SET children = array_append(children, $2)
            WHERE id = $1 AND NOT ($2 = ANY(children))
            "#,
        )
        .bind(parent_id)
        .bind(child_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_communities(
        &self,
        filter: &CommunityFilter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Community>> {
        let (limit, offset) = window(options);
        let sql = format!(
            "SELECT {COMMUNITY_COLUMNS} FROM communities {COMMUNITY_WHERE} {} LIMIT $2 OFFSET $3",
            order_by(options.sort)
        );

        let communities = sqlx::query_as::<_, Community>(&sql)
            .bind(filter.search().map(like_pattern))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(communities)
    }

    async fn count_communities(&self, filter: &CommunityFilter) -> StoreResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM communities {COMMUNITY_WHERE}");
        let (total,): (i64,) = sqlx::query_as(&sql)
            .bind(filter.search().map(like_pattern))
            .fetch_one(&self.pool)
            .await?;

        Ok(total.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ali"), "%ali%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn ordering_breaks_ties_on_id() {
        assert_eq!(
            order_by(SortDirection::Asc),
            "ORDER BY created_at ASC, id ASC"
        );
        assert_eq!(
            order_by(SortDirection::Desc),
            "ORDER BY created_at DESC, id DESC"
        );
    }

    #[test]
    fn window_maps_unbounded_limit_to_null() {
        let (limit, offset) = window(&FindOptions::default());
        assert_eq!(limit, None);
        assert_eq!(offset, 0);

        let (limit, offset) = window(&FindOptions::page(SortDirection::Desc, 40, 20));
        assert_eq!(limit, Some(20));
        assert_eq!(offset, 40);
    }
}
