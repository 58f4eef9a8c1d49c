use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use super::{ApiResult, SharedState};
use crate::{models::EngagementStatus, store::DocumentStore};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LikeRequest {
    post_id: String,
    user_id: String,
    is_liked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveRequest {
    post_id: String,
    user_id: String,
    is_saved: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LikeResponse {
    is_liked: bool,
    likes: u64,
    message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveResponse {
    is_saved: bool,
    message: &'static str,
}

pub(crate) async fn status<S: DocumentStore>(
    State(state): State<SharedState<S>>,
    Path((post_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<EngagementStatus>> {
    let status = state.repository.get_liked_and_saved(&post_id, &user_id).await?;
    Ok(Json(status))
}

pub(crate) async fn set_like<S: DocumentStore>(
    State(state): State<SharedState<S>>,
    payload: Result<Json<LikeRequest>, JsonRejection>,
) -> ApiResult<Json<LikeResponse>> {
    let Json(request) = payload?;
    let outcome = state
        .repository
        .set_like(&request.post_id, &request.user_id, request.is_liked)
        .await?;
    Ok(Json(LikeResponse {
        is_liked: outcome.is_liked,
        likes: outcome.likes,
        message: "Post like status updated successfully",
    }))
}

pub(crate) async fn set_save<S: DocumentStore>(
    State(state): State<SharedState<S>>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> ApiResult<Json<SaveResponse>> {
    let Json(request) = payload?;
    let outcome = state
        .repository
        .set_save(&request.post_id, &request.user_id, request.is_saved)
        .await?;
    Ok(Json(SaveResponse {
        is_saved: outcome.is_saved,
        message: "Post saved status updated successfully",
    }))
}
