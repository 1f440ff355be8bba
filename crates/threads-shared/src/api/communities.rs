use serde::{Deserialize, Serialize};

use crate::models::CommunityWithMembers;

#[derive(Debug, Serialize, Deserialize)]
pub struct CommunitiesPage {
    pub communities: Vec<CommunityWithMembers>,
    pub has_next: bool,
}
