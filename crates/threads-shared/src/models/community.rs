use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthorSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub image_url: String,
    pub bio: String,
    pub members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityWithMembers {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub image_url: String,
    pub bio: String,
    pub members: Vec<AuthorSummary>,
    pub created_at: DateTime<Utc>,
}
