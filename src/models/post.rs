use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Author, VoteProjection};

/// Upper bound on posts returned by the listing.
pub const POST_FETCH_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

// Create post request
#[derive(Debug, Validate, Deserialize)]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 180,
        message = "Title must be between 1 and 180 characters"
    ))]
    pub title: String,
    #[validate(length(
        min = 1,
        max = 360,
        message = "Content must be between 1 and 360 characters"
    ))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    #[serde(flatten)]
    pub votes: VoteProjection,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostWithAuthor {
    pub post: PostView,
    pub author: Author,
}
