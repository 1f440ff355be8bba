use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, routes::AppState};

use super::AuthUser;

/// Lets the request through only when the caller has a finished profile.
/// Must run after [`super::auth_middleware`].
pub async fn require_onboarded(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let external_id = request
        .extensions()
        .get::<AuthUser>()
        .map(|u| u.external_id.clone())
        .ok_or(AppError::Unauthorized)?;

    let onboarded = state
        .directory
        .fetch_user(&external_id)
        .await?
        .is_some_and(|u| u.onboarded);

    if !onboarded {
        tracing::debug!(%external_id, "caller not onboarded");
        return Err(AppError::OnboardingRequired);
    }

    Ok(next.run(request).await)
}
