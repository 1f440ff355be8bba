use serde::{Deserialize, Serialize};

use crate::models::User;

/// Profile form submission. `path` is the view the form was submitted from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub image_url: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersPage {
    pub users: Vec<User>,
    pub has_next: bool,
}
