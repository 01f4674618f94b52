use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, OptionalAuthUser},
    error::Result,
    handlers::parse_vote,
    models::{CreatePostRequest, Post, PostWithAuthor, VoteRequest, VoteResponse, VoteTarget},
    services::{post_service, vote_service},
};

pub async fn get_posts(
    State(state): State<AppState>,
    auth_user: OptionalAuthUser,
) -> Result<Json<Vec<PostWithAuthor>>> {
    let posts = post_service::get_posts(&state, auth_user.user_id()).await?;

    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    auth_user: OptionalAuthUser,
) -> Result<Json<PostWithAuthor>> {
    let post = post_service::get_post(&state, post_id, auth_user.user_id()).await?;

    Ok(Json(post))
}

pub async fn create_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    payload.validate()?;

    let post = post_service::create_post(&state.db, &auth_user.user_id, &payload).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn vote_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteResponse>> {
    let direction = parse_vote(&payload.vote)?;

    let vote_response = vote_service::vote(
        &state.db,
        VoteTarget::Post(post_id),
        &auth_user.user_id,
        direction,
    )
    .await?;

    Ok(Json(vote_response))
}
