use axum::{
    extract::{Path, State},
    Extension, Json,
};
use threads_shared::{api::CreateThreadRequest, ActivityItem, Thread};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

/// POST /api/v1/threads
pub async fn create_thread(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateThreadRequest>,
) -> Result<Json<Thread>, AppError> {
    if req.body.trim().is_empty() {
        return Err(AppError::Validation("Thread body is required".to_string()));
    }

    let thread = state
        .directory
        .create_thread(&user.external_id, &req.body)
        .await?;

    Ok(Json(thread))
}

/// POST /api/v1/threads/:thread_id/replies
pub async fn add_reply(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(thread_id): Path<Uuid>,
    Json(req): Json<CreateThreadRequest>,
) -> Result<Json<Thread>, AppError> {
    if req.body.trim().is_empty() {
        return Err(AppError::Validation("Reply body is required".to_string()));
    }

    let reply = state
        .directory
        .add_reply(&user.external_id, thread_id, &req.body)
        .await?;

    Ok(Json(reply))
}

/// GET /api/v1/me/activity
pub async fn activity(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ActivityItem>>, AppError> {
    let items = state.directory.get_activity(&user.external_id).await?;
    Ok(Json(items))
}
