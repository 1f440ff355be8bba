use serde::{Deserialize, Serialize};

/// Tells a presentation caller that its cached view of `path` is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invalidation {
    pub external_id: String,
    pub path: String,
}
