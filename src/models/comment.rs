use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Author, VoteProjection};

/// Whether a comment hangs off the post itself or off another comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    Post,
    Comment,
}

impl FromStr for CommentKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(CommentKind::Post),
            "comment" => Ok(CommentKind::Comment),
            _ => Err(format!("Unknown comment type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentParent {
    Post,
    Comment(Uuid),
}

/// A comment or reply, independent of which table it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author_id: String,
    pub post_id: Uuid,
    pub parent: CommentParent,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn kind(&self) -> CommentKind {
        match self.parent {
            CommentParent::Post => CommentKind::Post,
            CommentParent::Comment(_) => CommentKind::Comment,
        }
    }

    pub fn parent_comment_id(&self) -> Option<Uuid> {
        match self.parent {
            CommentParent::Post => None,
            CommentParent::Comment(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PostCommentRow {
    pub id: Uuid,
    pub content: String,
    pub author_id: String,
    pub post_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<PostCommentRow> for Comment {
    fn from(row: PostCommentRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            author_id: row.author_id,
            post_id: row.post_id,
            parent: CommentParent::Post,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentCommentRow {
    pub id: Uuid,
    pub content: String,
    pub author_id: String,
    pub post_id: Uuid,
    pub parent_comment_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<CommentCommentRow> for Comment {
    fn from(row: CommentCommentRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            author_id: row.author_id,
            post_id: row.post_id,
            parent: CommentParent::Comment(row.parent_comment_id),
            created_at: row.created_at,
        }
    }
}

// Create comment request (top-level or reply; ids come from the path)
#[derive(Debug, Validate, Deserialize)]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 360,
        message = "Comment must be between 1 and 360 characters"
    ))]
    pub content: String,
}

// Comment as seen by one viewer, with its replies nested under it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub content: String,
    pub author_id: String,
    pub post_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub votes: VoteProjection,
    pub comment_type: CommentKind,
    pub comments: Vec<CommentNode>,
}

impl CommentView {
    pub fn new(comment: &Comment, votes: VoteProjection, comments: Vec<CommentNode>) -> Self {
        Self {
            id: comment.id,
            content: comment.content.clone(),
            author_id: comment.author_id.clone(),
            post_id: comment.post_id,
            parent_comment_id: comment.parent_comment_id(),
            created_at: comment.created_at,
            votes,
            comment_type: comment.kind(),
            comments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    pub comment: CommentView,
    pub author: Author,
}
