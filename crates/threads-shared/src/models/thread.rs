use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActivityAuthor, AuthorSummary, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Thread {
    pub id: Uuid,
    pub author_id: Uuid,
    /// Set on replies only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub body: String,
    /// Replies linked to this thread. The replies exist on their own.
    pub children: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A reply with its author resolved. Its own replies stay as ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub body: String,
    pub children: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub author: Option<AuthorSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadWithReplies {
    #[serde(flatten)]
    pub thread: Thread,
    #[serde(rename = "replies")]
    pub children: Vec<Reply>,
}

/// A user with threads expanded two levels deep: threads, then their
/// replies with a minimal author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWithThreads {
    pub user: User,
    pub threads: Vec<ThreadWithReplies>,
}

/// Someone else's reply to one of the caller's threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<ActivityAuthor>,
}
