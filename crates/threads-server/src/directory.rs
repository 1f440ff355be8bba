//! The user/thread directory.
//!
//! [`Directory`] is the facade presentation callers use to read and write
//! profiles, threads and communities. Every operation is a short sequence of
//! store round-trips; failures are reported once, wrapped in a
//! [`DirectoryError`] naming the operation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use threads_shared::{
    api::{CommunitiesPage, Invalidation, SortDirection, UpdateProfileRequest, UsersPage},
    ActivityAuthor, ActivityItem, AuthorSummary, CommunityWithMembers, Reply, Thread,
    ThreadWithReplies, User, UserWithThreads, PROFILE_EDIT_PATH,
};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::store::{
    CommunityFilter, DirectoryStore, FindOptions, NewThread, StoreError, StoreResult,
    ThreadFilter, UserFilter, UserUpsert,
};

const INVALIDATION_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("failed to create/update user: {0}")]
    UpsertUser(String),

    #[error("failed to fetch user: {0}")]
    FetchUser(String),

    #[error("failed to fetch user posts: {0}")]
    FetchUserThreads(String),

    #[error("failed to fetch users: {0}")]
    FetchUsers(String),

    #[error("failed to fetch activity: {0}")]
    FetchActivity(String),

    #[error("failed to fetch communities: {0}")]
    FetchCommunities(String),

    #[error("failed to create thread: {0}")]
    CreateThread(String),

    #[error("failed to add reply: {0}")]
    AddReply(String),
}

#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn DirectoryStore>,
    invalidations: broadcast::Sender<Invalidation>,
}

impl Directory {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        let (invalidations, _) = broadcast::channel(INVALIDATION_CAPACITY);
        Self {
            store,
            invalidations,
        }
    }

    /// Receives view invalidations emitted by profile saves.
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.invalidations.subscribe()
    }

    /// Creates or updates the profile of `external_id` and marks it onboarded.
    ///
    /// Saving from [`PROFILE_EDIT_PATH`] broadcasts an [`Invalidation`] for
    /// that path once the write succeeded.
    pub async fn upsert_user(
        &self,
        external_id: &str,
        profile: &UpdateProfileRequest,
    ) -> Result<(), DirectoryError> {
        if external_id.trim().is_empty() {
            return Err(DirectoryError::UpsertUser(
                "external id must not be empty".to_string(),
            ));
        }

        let upsert = UserUpsert {
            external_id: external_id.to_string(),
            username: profile.username.to_lowercase(),
            display_name: profile.display_name.clone(),
            bio: profile.bio.clone(),
            image_url: profile.image_url.clone(),
        };

        self.store
            .upsert_user(&upsert)
            .await
            .map_err(|e| DirectoryError::UpsertUser(e.to_string()))?;

        if profile.path == PROFILE_EDIT_PATH {
            tracing::debug!(external_id, path = %profile.path, "invalidating view");
            // Err only means nobody is listening.
            let _ = self.invalidations.send(Invalidation {
                external_id: external_id.to_string(),
                path: profile.path.clone(),
            });
        }

        Ok(())
    }

    /// Returns `Ok(None)` when no user has this id.
    pub async fn fetch_user(&self, external_id: &str) -> Result<Option<User>, DirectoryError> {
        self.store
            .find_user(external_id)
            .await
            .map_err(|e| DirectoryError::FetchUser(e.to_string()))
    }

    /// Loads a user with their threads, each thread's replies, and each
    /// reply's author. Nothing deeper is expanded.
    pub async fn fetch_user_with_threads(
        &self,
        external_id: &str,
    ) -> Result<Option<UserWithThreads>, DirectoryError> {
        self.load_user_with_threads(external_id)
            .await
            .map_err(|e| DirectoryError::FetchUserThreads(e.to_string()))
    }

    async fn load_user_with_threads(
        &self,
        external_id: &str,
    ) -> StoreResult<Option<UserWithThreads>> {
        let Some(user) = self.store.find_user(external_id).await? else {
            return Ok(None);
        };

        let mut threads: HashMap<Uuid, Thread> = self
            .threads_by_id(user.threads.clone())
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        let threads: Vec<Thread> = user
            .threads
            .iter()
            .filter_map(|id| threads.remove(id))
            .collect();

        let replies: HashMap<Uuid, Thread> = self
            .threads_by_id(collect_children(&threads))
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        let authors = self
            .users_by_id(replies.values().map(|r| r.author_id))
            .await?;

        let threads = threads
            .into_iter()
            .map(|thread| {
                let children = thread
                    .children
                    .iter()
                    .filter_map(|id| replies.get(id))
                    .map(|reply| Reply {
                        id: reply.id,
                        parent_id: reply.parent_id,
                        body: reply.body.clone(),
                        children: reply.children.clone(),
                        created_at: reply.created_at,
                        author: authors.get(&reply.author_id).map(AuthorSummary::from),
                    })
                    .collect();
                ThreadWithReplies { thread, children }
            })
            .collect();

        Ok(Some(UserWithThreads { user, threads }))
    }

    /// Lists users other than `exclude_external_id`, newest or oldest first.
    /// A non-blank `search` narrows to usernames or display names containing it.
    pub async fn search_users(
        &self,
        exclude_external_id: &str,
        search: &str,
        page_number: u32,
        page_size: u32,
        sort: SortDirection,
    ) -> Result<UsersPage, DirectoryError> {
        let (skip, limit) =
            page_window(page_number, page_size).map_err(DirectoryError::FetchUsers)?;
        let filter = UserFilter::new()
            .excluding(exclude_external_id)
            .matching(search);
        let fail = |e: StoreError| DirectoryError::FetchUsers(e.to_string());

        let users = self
            .store
            .find_users(&filter, &FindOptions::page(sort, skip, limit))
            .await
            .map_err(fail)?;
        let total = self.store.count_users(&filter).await.map_err(fail)?;

        let has_next = total > skip + users.len() as u64;
        Ok(UsersPage { users, has_next })
    }

    /// Replies by other users to threads `external_id` wrote.
    pub async fn get_activity(
        &self,
        external_id: &str,
    ) -> Result<Vec<ActivityItem>, DirectoryError> {
        self.load_activity(external_id)
            .await
            .map_err(|e| DirectoryError::FetchActivity(e.to_string()))
    }

    async fn load_activity(&self, external_id: &str) -> StoreResult<Vec<ActivityItem>> {
        let Some(user) = self.store.find_user(external_id).await? else {
            return Ok(Vec::new());
        };

        let authored = self
            .store
            .find_threads(&ThreadFilter::new().authored_by(user.id))
            .await?;
        let child_ids = collect_children(&authored);
        if child_ids.is_empty() {
            return Ok(Vec::new());
        }

        let replies = self
            .store
            .find_threads(&ThreadFilter::new().with_ids(child_ids).not_authored_by(user.id))
            .await?;
        let authors = self.users_by_id(replies.iter().map(|r| r.author_id)).await?;

        Ok(replies
            .into_iter()
            .map(|reply| ActivityItem {
                author: authors.get(&reply.author_id).map(ActivityAuthor::from),
                id: reply.id,
                parent_id: reply.parent_id,
                body: reply.body,
                created_at: reply.created_at,
            })
            .collect())
    }

    pub async fn search_communities(
        &self,
        search: &str,
        page_number: u32,
        page_size: u32,
        sort: SortDirection,
    ) -> Result<CommunitiesPage, DirectoryError> {
        let (skip, limit) =
            page_window(page_number, page_size).map_err(DirectoryError::FetchCommunities)?;
        let fail = |e: StoreError| DirectoryError::FetchCommunities(e.to_string());
        let filter = CommunityFilter::new().matching(search);

        let communities = self
            .store
            .find_communities(&filter, &FindOptions::page(sort, skip, limit))
            .await
            .map_err(fail)?;
        let total = self.store.count_communities(&filter).await.map_err(fail)?;
        let has_next = total > skip + communities.len() as u64;

        let members = self
            .users_by_id(communities.iter().flat_map(|c| c.members.iter().copied()))
            .await
            .map_err(fail)?;

        let communities = communities
            .into_iter()
            .map(|c| CommunityWithMembers {
                members: c
                    .members
                    .iter()
                    .filter_map(|id| members.get(id))
                    .map(AuthorSummary::from)
                    .collect(),
                id: c.id,
                name: c.name,
                username: c.username,
                image_url: c.image_url,
                bio: c.bio,
                created_at: c.created_at,
            })
            .collect();

        Ok(CommunitiesPage {
            communities,
            has_next,
        })
    }

    /// Posts a top-level thread and appends it to the author's threads.
    pub async fn create_thread(
        &self,
        external_id: &str,
        body: &str,
    ) -> Result<Thread, DirectoryError> {
        let fail = |e: StoreError| DirectoryError::CreateThread(e.to_string());
        if body.trim().is_empty() {
            return Err(DirectoryError::CreateThread(
                "thread body must not be empty".to_string(),
            ));
        }

        let author = self
            .store
            .find_user(external_id)
            .await
            .map_err(fail)?
            .ok_or_else(|| DirectoryError::CreateThread(format!("user {external_id} not found")))?;

        let thread = self
            .store
            .insert_thread(&NewThread {
                author_id: author.id,
                parent_id: None,
                body: body.to_string(),
            })
            .await
            .map_err(fail)?;
        self.store
            .append_user_thread(author.id, thread.id)
            .await
            .map_err(fail)?;

        tracing::debug!(thread_id = %thread.id, author = %author.id, "created thread");
        Ok(thread)
    }

    /// Posts a reply and links it under `parent_id`. The reply gets a fresh id,
    /// so a thread can never end up among its own children.
    pub async fn add_reply(
        &self,
        external_id: &str,
        parent_id: Uuid,
        body: &str,
    ) -> Result<Thread, DirectoryError> {
        let fail = |e: StoreError| DirectoryError::AddReply(e.to_string());
        if body.trim().is_empty() {
            return Err(DirectoryError::AddReply(
                "reply body must not be empty".to_string(),
            ));
        }

        let author = self
            .store
            .find_user(external_id)
            .await
            .map_err(fail)?
            .ok_or_else(|| DirectoryError::AddReply(format!("user {external_id} not found")))?;

        let parent = self
            .store
            .find_threads(&ThreadFilter::new().with_ids(vec![parent_id]))
            .await
            .map_err(fail)?
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::AddReply(format!("thread {parent_id} not found")))?;

        let reply = self
            .store
            .insert_thread(&NewThread {
                author_id: author.id,
                parent_id: Some(parent.id),
                body: body.to_string(),
            })
            .await
            .map_err(fail)?;
        self.store
            .append_thread_child(parent.id, reply.id)
            .await
            .map_err(fail)?;

        tracing::debug!(reply_id = %reply.id, parent_id = %parent.id, "added reply");
        Ok(reply)
    }

    async fn threads_by_id(&self, ids: Vec<Uuid>) -> StoreResult<Vec<Thread>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .find_threads(&ThreadFilter::new().with_ids(ids))
            .await
    }

    async fn users_by_id(
        &self,
        ids: impl Iterator<Item = Uuid>,
    ) -> StoreResult<HashMap<Uuid, User>> {
        let ids: Vec<Uuid> = ids.collect::<HashSet<_>>().into_iter().collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = self
            .store
            .find_users(&UserFilter::new().with_ids(ids), &FindOptions::default())
            .await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }
}

/// Reply ids across `threads`, first occurrence kept.
fn collect_children(threads: &[Thread]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    threads
        .iter()
        .flat_map(|t| t.children.iter().copied())
        .filter(|id| seen.insert(*id))
        .collect()
}

fn page_window(page_number: u32, page_size: u32) -> Result<(u64, u64), String> {
    if page_number == 0 {
        return Err("page number must be at least 1".to_string());
    }
    if page_size == 0 {
        return Err("page size must be positive".to_string());
    }
    let size = u64::from(page_size);
    Ok((u64::from(page_number - 1) * size, size))
}
