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
    error::{AppError, Result},
    handlers::parse_vote,
    models::{
        CommentKind, CommentNode, CommentVoteRequest, CreateCommentRequest, VoteResponse,
        VoteTarget,
    },
    services::{comment_service, vote_service},
};

pub async fn get_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    auth_user: OptionalAuthUser,
) -> Result<Json<Vec<CommentNode>>> {
    let comments =
        comment_service::get_post_comments(&state, post_id, auth_user.user_id()).await?;

    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentNode>)> {
    payload.validate()?;

    let comment =
        comment_service::create_post_comment(&state, post_id, &auth_user.user_id, &payload)
            .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn create_reply(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentNode>)> {
    payload.validate()?;

    let reply = comment_service::create_reply(
        &state,
        post_id,
        comment_id,
        &auth_user.user_id,
        &payload,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(reply)))
}

pub async fn vote_comment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<CommentVoteRequest>,
) -> Result<Json<VoteResponse>> {
    let kind: CommentKind = payload.comment_type.parse().map_err(|_| {
        AppError::field("commentType", "Comment type must be \"post\" or \"comment\"")
    })?;
    let direction = parse_vote(&payload.vote)?;

    let vote_response = vote_service::vote(
        &state.db,
        VoteTarget::Comment {
            kind,
            id: comment_id,
        },
        &auth_user.user_id,
        direction,
    )
    .await?;

    Ok(Json(vote_response))
}
