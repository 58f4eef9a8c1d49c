use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};

use super::{ApiResult, SharedState};
use crate::{
    models::{Category, NewPost, PostSummary, PublicUser, Registration},
    store::DocumentStore,
};

#[derive(Debug, Serialize)]
pub(crate) struct RegisteredResponse {
    message: &'static str,
    user: PublicUser,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatedPostResponse {
    message: &'static str,
    post: PostSummary,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewCategory {
    name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatedCategoryResponse {
    message: &'static str,
    category: Category,
}

#[derive(Debug, Serialize)]
pub(crate) struct CategoryList {
    categories: Vec<Category>,
}

pub(crate) async fn register<S: DocumentStore>(
    State(state): State<SharedState<S>>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisteredResponse>)> {
    let Json(registration) = payload?;
    let user = state.repository.register_user(registration).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            message: "User registered successfully",
            user,
        }),
    ))
}

pub(crate) async fn create_post<S: DocumentStore>(
    State(state): State<SharedState<S>>,
    headers: HeaderMap,
    payload: Result<Json<NewPost>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedPostResponse>)> {
    let Json(input) = payload?;
    let origin = state.origin(&headers);
    let post = state.repository.create_post(input, &origin).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedPostResponse {
            message: "Post created successfully",
            post,
        }),
    ))
}

pub(crate) async fn list_categories<S: DocumentStore>(
    State(state): State<SharedState<S>>,
) -> ApiResult<Json<CategoryList>> {
    let categories = state.repository.list_categories().await?;
    Ok(Json(CategoryList { categories }))
}

pub(crate) async fn create_category<S: DocumentStore>(
    State(state): State<SharedState<S>>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedCategoryResponse>)> {
    let Json(input) = payload?;
    let category = state.repository.create_category(&input.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedCategoryResponse {
            message: "Category created successfully",
            category,
        }),
    ))
}
