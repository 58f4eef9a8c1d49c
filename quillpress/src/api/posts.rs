use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};

use super::{ApiResult, SharedState};
use crate::{
    models::{PostDetail, PostPage},
    search::PostQuery,
    store::DocumentStore,
};

pub(crate) async fn list_posts<S: DocumentStore>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    Query(query): Query<PostQuery>,
) -> ApiResult<Json<PostPage>> {
    let origin = state.origin(&headers);
    let page = state.repository.list_posts(query.into_params(), &origin).await?;
    Ok(Json(page))
}

pub(crate) async fn post_detail<S: DocumentStore>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> ApiResult<Json<PostDetail>> {
    let origin = state.origin(&headers);
    let post = state.repository.get_post_by_slug(&slug, &origin).await?;
    Ok(Json(post))
}

pub(crate) async fn saved_posts<S: DocumentStore>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<Json<PostPage>> {
    let origin = state.origin(&headers);
    let page = state.repository.saved_posts(&user_id, &origin).await?;
    Ok(Json(page))
}
