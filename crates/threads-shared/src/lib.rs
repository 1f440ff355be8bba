pub mod api;
pub mod models;

pub use models::*;

/// Path of the profile edit view. Saving a profile from here invalidates it.
pub const PROFILE_EDIT_PATH: &str = "/profile/edit";

/// Where callers without a finished profile are sent.
pub const ONBOARDING_PATH: &str = "/onboarding";
