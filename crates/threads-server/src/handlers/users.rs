use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use threads_shared::{
    api::{SearchParams, UpdateProfileRequest, UsersPage},
    User, UserWithThreads,
};

use super::paging;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

/// GET /api/v1/me
///
/// `null` until the caller has saved a profile.
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Option<User>>, AppError> {
    let user = state.directory.fetch_user(&user.external_id).await?;
    Ok(Json(user))
}

/// PUT /api/v1/me
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<(), AppError> {
    let required = [
        ("username", &req.username),
        ("display_name", &req.display_name),
        ("bio", &req.bio),
        ("image_url", &req.image_url),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(AppError::Validation(format!("{field} is required")));
    }

    state.directory.upsert_user(&user.external_id, &req).await?;

    Ok(())
}

/// GET /api/v1/users
pub async fn search_users(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<SearchParams>,
) -> Result<Json<UsersPage>, AppError> {
    let (page, limit, sort) = paging(&params);

    let result = state
        .directory
        .search_users(&user.external_id, &params.q, page, limit, sort)
        .await?;

    Ok(Json(result))
}

/// GET /api/v1/users/:external_id
pub async fn get_user(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = state
        .directory
        .fetch_user(&external_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(user))
}

/// GET /api/v1/users/:external_id/threads
pub async fn get_user_threads(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<UserWithThreads>, AppError> {
    let user = state
        .directory
        .fetch_user_with_threads(&external_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(user))
}
