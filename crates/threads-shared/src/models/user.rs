use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    /// Stable id issued by the identity provider.
    pub external_id: String,
    /// Always stored lowercase.
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub image_url: String,
    pub onboarded: bool,
    /// Top-level threads authored by this user, oldest first.
    pub threads: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Minimal author view attached to replies and community members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub external_id: String,
    pub display_name: String,
    pub image_url: String,
}

impl From<&User> for AuthorSummary {
    fn from(user: &User) -> Self {
        Self {
            external_id: user.external_id.clone(),
            display_name: user.display_name.clone(),
            image_url: user.image_url.clone(),
        }
    }
}

/// Author view used by the activity feed, keyed by the internal id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityAuthor {
    pub id: Uuid,
    pub display_name: String,
    pub image_url: String,
}

impl From<&User> for ActivityAuthor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name.clone(),
            image_url: user.image_url.clone(),
        }
    }
}
