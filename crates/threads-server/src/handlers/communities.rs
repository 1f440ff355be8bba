use axum::{
    extract::{Query, State},
    Json,
};
use threads_shared::api::{CommunitiesPage, SearchParams};

use super::paging;
use crate::error::AppError;
use crate::routes::AppState;

/// GET /api/v1/communities
pub async fn list_communities(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<CommunitiesPage>, AppError> {
    let (page, limit, sort) = paging(&params);

    let result = state
        .directory
        .search_communities(&params.q, page, limit, sort)
        .await?;

    Ok(Json(result))
}
