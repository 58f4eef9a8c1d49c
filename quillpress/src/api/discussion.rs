use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::Serialize;

use super::{ApiResult, SharedState};
use crate::{
    models::{CommentView, NewComment, NewReply},
    store::DocumentStore,
};

#[derive(Debug, Serialize)]
pub(crate) struct CommentResponse {
    message: &'static str,
    comment: CommentView,
}

pub(crate) async fn add_comment<S: DocumentStore>(
    State(state): State<SharedState<S>>,
    payload: Result<Json<NewComment>, JsonRejection>,
) -> ApiResult<Json<CommentResponse>> {
    let Json(input) = payload?;
    let comment = state.repository.add_comment(input).await?;
    Ok(Json(CommentResponse {
        message: "Comment added successfully",
        comment,
    }))
}

pub(crate) async fn add_reply<S: DocumentStore>(
    State(state): State<SharedState<S>>,
    payload: Result<Json<NewReply>, JsonRejection>,
) -> ApiResult<Json<CommentResponse>> {
    let Json(input) = payload?;
    let comment = state.repository.add_reply(input).await?;
    Ok(Json(CommentResponse {
        message: "Reply added successfully",
        comment,
    }))
}
