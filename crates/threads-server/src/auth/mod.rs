mod jwt;
mod middleware;
mod onboarding;

pub use jwt::{verify_identity_token, Claims};
pub use middleware::{auth_middleware, AuthUser};
pub use onboarding::require_onboarded;
