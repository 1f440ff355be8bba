use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use regex::{Regex, RegexBuilder};
use threads_shared::{api::SortDirection, Community, Thread, User};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CommunityFilter, DirectoryStore, FindOptions, NewThread, StoreError, StoreResult,
    ThreadFilter, UserFilter, UserUpsert,
};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    threads: Vec<Thread>,
    communities: Vec<Community>,
}

/// In-process store. Collections keep insertion order, which is the order
/// unsorted queries return.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn seed_user(&self, user: User) {
        self.collections.write().await.users.push(user);
    }

    pub async fn seed_thread(&self, thread: Thread) {
        self.collections.write().await.threads.push(thread);
    }

    pub async fn seed_community(&self, community: Community) {
        self.collections.write().await.communities.push(community);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

fn search_regex(term: Option<&str>) -> StoreResult<Option<Regex>> {
    term.map(|term| {
        RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()
            .map_err(|e| StoreError::Query(e.to_string()))
    })
    .transpose()
}

fn user_matches(user: &User, filter: &UserFilter, search: Option<&Regex>) -> bool {
    if let Some(ids) = filter.ids() {
        if !ids.contains(&user.id) {
            return false;
        }
    }
    if filter.excluded_external_id() == Some(user.external_id.as_str()) {
        return false;
    }
    match search {
        Some(re) => re.is_match(&user.username) || re.is_match(&user.display_name),
        None => true,
    }
}

fn community_matches(community: &Community, search: Option<&Regex>) -> bool {
    match search {
        Some(re) => re.is_match(&community.name) || re.is_match(&community.username),
        None => true,
    }
}

fn thread_matches(thread: &Thread, filter: &ThreadFilter) -> bool {
    if let Some(ids) = filter.ids() {
        if !ids.contains(&thread.id) {
            return false;
        }
    }
    if let Some(author_id) = filter.author_id() {
        if thread.author_id != author_id {
            return false;
        }
    }
    filter.excluded_author_id() != Some(thread.author_id)
}

/// Sorts by creation time and cuts the requested window. The sort is stable,
/// so ties keep insertion order.
fn apply_window<T>(
    mut items: Vec<T>,
    options: &FindOptions,
    created_at: impl Fn(&T) -> chrono::DateTime<Utc>,
) -> Vec<T> {
    match options.sort {
        SortDirection::Asc => items.sort_by_key(|item| created_at(item)),
        SortDirection::Desc => items.sort_by(|a, b| created_at(b).cmp(&created_at(a))),
    }

    let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
    let iter = items.into_iter().skip(skip);
    match options.limit {
        Some(limit) => iter
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect(),
        None => iter.collect(),
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn find_user(&self, external_id: &str) -> StoreResult<Option<User>> {
        self.ensure_available()?;
        let collections = self.collections.read().await;
        Ok(collections
            .users
            .iter()
            .find(|u| u.external_id == external_id)
            .cloned())
    }

    async fn find_users(
        &self,
        filter: &UserFilter,
        options: &FindOptions,
    ) -> StoreResult<Vec<User>> {
        self.ensure_available()?;
        let search = search_regex(filter.search())?;
        let collections = self.collections.read().await;
        let matched: Vec<User> = collections
            .users
            .iter()
            .filter(|u| user_matches(u, filter, search.as_ref()))
            .cloned()
            .collect();
        Ok(apply_window(matched, options, |u| u.created_at))
    }

    async fn count_users(&self, filter: &UserFilter) -> StoreResult<u64> {
        self.ensure_available()?;
        let search = search_regex(filter.search())?;
        let collections = self.collections.read().await;
        let count = collections
            .users
            .iter()
            .filter(|u| user_matches(u, filter, search.as_ref()))
            .count();
        Ok(count as u64)
    }

    async fn upsert_user(&self, upsert: &UserUpsert) -> StoreResult<()> {
        self.ensure_available()?;
        let mut collections = self.collections.write().await;

        let taken = collections
            .users
            .iter()
            .any(|u| u.username == upsert.username && u.external_id != upsert.external_id);
        if taken {
            return Err(StoreError::Conflict(format!(
                "username '{}' is already taken",
                upsert.username
            )));
        }

        match collections
            .users
            .iter_mut()
            .find(|u| u.external_id == upsert.external_id)
        {
            Some(user) => {
                user.username = upsert.username.clone();
                user.display_name = upsert.display_name.clone();
                user.bio = upsert.bio.clone();
                user.image_url = upsert.image_url.clone();
                user.onboarded = true;
            }
            None => collections.users.push(User {
                id: Uuid::new_v4(),
                external_id: upsert.external_id.clone(),
                username: upsert.username.clone(),
                display_name: upsert.display_name.clone(),
                bio: upsert.bio.clone(),
                image_url: upsert.image_url.clone(),
                onboarded: true,
                threads: Vec::new(),
                created_at: Utc::now(),
            }),
        }

        Ok(())
    }

    async fn find_threads(&self, filter: &ThreadFilter) -> StoreResult<Vec<Thread>> {
        self.ensure_available()?;
        let collections = self.collections.read().await;
        Ok(collections
            .threads
            .iter()
            .filter(|t| thread_matches(t, filter))
            .cloned()
            .collect())
    }

    async fn insert_thread(&self, thread: &NewThread) -> StoreResult<Thread> {
        self.ensure_available()?;
        let thread = Thread {
            id: Uuid::new_v4(),
            author_id: thread.author_id,
            parent_id: thread.parent_id,
            body: thread.body.clone(),
            children: Vec::new(),
            created_at: Utc::now(),
        };
        self.collections.write().await.threads.push(thread.clone());
        Ok(thread)
    }

    async fn append_user_thread(&self, user_id: Uuid, thread_id: Uuid) -> StoreResult<()> {
        self.ensure_available()?;
        let mut collections = self.collections.write().await;
        if let Some(user) = collections.users.iter_mut().find(|u| u.id == user_id) {
            user.threads.push(thread_id);
        }
        Ok(())
    }

    async fn append_thread_child(&self, parent_id: Uuid, child_id: Uuid) -> StoreResult<()> {
        self.ensure_available()?;
        let mut collections = self.collections.write().await;
        if let Some(parent) = collections.threads.iter_mut().find(|t| t.id == parent_id) {
            if !parent.children.contains(&child_id) {
                parent.children.push(child_id);
            }
        }
        Ok(())
    }

    async fn find_communities(
        &self,
        filter: &CommunityFilter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Community>> {
        self.ensure_available()?;
        let search = search_regex(filter.search())?;
        let collections = self.collections.read().await;
        let matched: Vec<Community> = collections
            .communities
            .iter()
            .filter(|c| community_matches(c, search.as_ref()))
            .cloned()
            .collect();
        Ok(apply_window(matched, options, |c| c.created_at))
    }

    async fn count_communities(&self, filter: &CommunityFilter) -> StoreResult<u64> {
        self.ensure_available()?;
        let search = search_regex(filter.search())?;
        let collections = self.collections.read().await;
        let count = collections
            .communities
            .iter()
            .filter(|c| community_matches(c, search.as_ref()))
            .count();
        Ok(count as u64)
    }
}
