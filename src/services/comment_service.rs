use std::collections::HashMap;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
    identity::{self, require_author},
    models::{
        Author, Comment, CommentCommentRow, CommentNode, CommentParent, CommentView,
        CreateCommentRequest, PostCommentRow, VotableKind, VoteLedger, VoteProjection,
    },
    services::{post_service, vote_service},
};

/// Builds the annotated comment forest of one post.
///
/// `top_level` holds the comments made on the post and `replies` every reply
/// under it, at any depth. Replies are attached through their parent id, so
/// both inputs may arrive in any order. Siblings come out oldest first, with
/// the id breaking ties. A reply whose parent is not among the inputs is
/// unreachable and left out.
///
/// Fails if any comment's author is missing from `authors` or has neither a
/// username nor a first name; no partial tree is returned.
pub fn assemble_comment_tree(
    top_level: &[Comment],
    replies: &[Comment],
    ledgers: &HashMap<Uuid, VoteLedger>,
    authors: &HashMap<String, Author>,
    viewer_id: Option<&str>,
) -> Result<Vec<CommentNode>> {
    let mut children: HashMap<Uuid, Vec<&Comment>> = HashMap::new();
    for reply in replies {
        if let CommentParent::Comment(parent_id) = reply.parent {
            children.entry(parent_id).or_default().push(reply);
        }
    }
    for siblings in children.values_mut() {
        sort_oldest_first(siblings);
    }

    let mut roots: Vec<&Comment> = top_level.iter().collect();
    sort_oldest_first(&mut roots);

    let builder = TreeBuilder {
        children,
        ledgers,
        authors,
        viewer_id,
    };

    roots.into_iter().map(|root| builder.node(root)).collect()
}

fn sort_oldest_first(comments: &mut [&Comment]) {
    comments.sort_by_key(|comment| (comment.created_at, comment.id));
}

struct TreeBuilder<'a> {
    children: HashMap<Uuid, Vec<&'a Comment>>,
    ledgers: &'a HashMap<Uuid, VoteLedger>,
    authors: &'a HashMap<String, Author>,
    viewer_id: Option<&'a str>,
}

impl TreeBuilder<'_> {
    fn node(&self, comment: &Comment) -> Result<CommentNode> {
        let author = require_author(self.authors, &comment.author_id, "comment")?;

        let votes = self
            .ledgers
            .get(&comment.id)
            .map(|ledger| ledger.project(self.viewer_id))
            .unwrap_or_default();

        let comments = match self.children.get(&comment.id) {
            Some(replies) => replies
                .iter()
                .map(|reply| self.node(reply))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(CommentNode {
            comment: CommentView::new(comment, votes, comments),
            author,
        })
    }
}

pub async fn get_post_comment_raw(db: &PgPool, comment_id: Uuid) -> Result<Option<Comment>> {
    let row = sqlx::query_as::<_, PostCommentRow>(
        "SELECT id, content, author_id, post_id, created_at FROM post_comments WHERE id = $1",
    )
    .bind(comment_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(Comment::from))
}

pub async fn get_comment_comment_raw(db: &PgPool, comment_id: Uuid) -> Result<Option<Comment>> {
    let row = sqlx::query_as::<_, CommentCommentRow>(
        r#"
        SELECT id, content, author_id, post_id, parent_comment_id, created_at
        FROM comment_comments
        WHERE id = $1
        "#,
    )
    .bind(comment_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(Comment::from))
}

/// Finds a comment that may live in either table.
pub async fn get_comment_by_id_raw(db: &PgPool, comment_id: Uuid) -> Result<Option<Comment>> {
    if let Some(comment) = get_post_comment_raw(db, comment_id).await? {
        return Ok(Some(comment));
    }
    get_comment_comment_raw(db, comment_id).await
}

async fn get_top_level_comments(db: &PgPool, post_id: Uuid) -> Result<Vec<Comment>> {
    let rows = sqlx::query_as::<_, PostCommentRow>(
        r#"
        SELECT id, content, author_id, post_id, created_at
        FROM post_comments
        WHERE post_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Comment::from).collect())
}

// Keyed by post rather than parent so one query covers every depth.
async fn get_reply_comments(db: &PgPool, post_id: Uuid) -> Result<Vec<Comment>> {
    let rows = sqlx::query_as::<_, CommentCommentRow>(
        r#"
        SELECT id, content, author_id, post_id, parent_comment_id, created_at
        FROM comment_comments
        WHERE post_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Comment::from).collect())
}

async fn get_comment_ledgers(
    db: &PgPool,
    top_level: &[Comment],
    replies: &[Comment],
) -> Result<HashMap<Uuid, VoteLedger>> {
    let top_level_ids: Vec<Uuid> = top_level.iter().map(|c| c.id).collect();
    let reply_ids: Vec<Uuid> = replies.iter().map(|c| c.id).collect();

    let (mut ledgers, reply_ledgers) = futures::future::try_join(
        vote_service::load_ledgers(db, VotableKind::PostComment, &top_level_ids),
        vote_service::load_ledgers(db, VotableKind::CommentComment, &reply_ids),
    )
    .await?;

    ledgers.extend(reply_ledgers);
    Ok(ledgers)
}

pub async fn get_post_comments(
    state: &AppState,
    post_id: Uuid,
    viewer_id: Option<&str>,
) -> Result<Vec<CommentNode>> {
    post_service::get_post_by_id_raw(&state.db, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let (top_level, replies) = futures::future::try_join(
        get_top_level_comments(&state.db, post_id),
        get_reply_comments(&state.db, post_id),
    )
    .await?;

    if top_level.is_empty() {
        return Ok(Vec::new());
    }

    let ledgers = get_comment_ledgers(&state.db, &top_level, &replies).await?;

    let authors = identity::resolve_authors(
        state.identity.as_ref(),
        top_level
            .iter()
            .chain(replies.iter())
            .map(|comment| comment.author_id.as_str()),
        state.config.identity_page_limit,
    )
    .await?;

    let tree = assemble_comment_tree(&top_level, &replies, &ledgers, &authors, viewer_id)?;
    tracing::debug!(
        %post_id,
        top_level = top_level.len(),
        replies = replies.len(),
        "Assembled comment tree"
    );

    Ok(tree)
}

async fn fresh_node(state: &AppState, comment: &Comment) -> Result<CommentNode> {
    let author = state
        .identity
        .get_user(&comment.author_id)
        .await?
        .map(identity::filter_user_for_client)
        .filter(Author::is_resolvable)
        .ok_or_else(|| AppError::Internal("Author for comment not found".to_string()))?;

    Ok(CommentNode {
        comment: CommentView::new(comment, VoteProjection::default(), Vec::new()),
        author,
    })
}

/// Adds a comment directly on a post. The result is ready for the client to
/// append without refetching the tree.
pub async fn create_post_comment(
    state: &AppState,
    post_id: Uuid,
    author_id: &str,
    request: &CreateCommentRequest,
) -> Result<CommentNode> {
    post_service::get_post_by_id_raw(&state.db, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let row = sqlx::query_as::<_, PostCommentRow>(
        r#"
        INSERT INTO post_comments (id, content, author_id, post_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, content, author_id, post_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&request.content)
    .bind(author_id)
    .bind(post_id)
    .bind(Utc::now())
    .fetch_one(&state.db)
    .await?;

    let comment = Comment::from(row);
    tracing::info!(comment_id = %comment.id, %post_id, "Comment created");

    fresh_node(state, &comment).await
}

/// Adds a reply under an existing comment of the same post.
pub async fn create_reply(
    state: &AppState,
    post_id: Uuid,
    parent_comment_id: Uuid,
    author_id: &str,
    request: &CreateCommentRequest,
) -> Result<CommentNode> {
    let parent = get_comment_by_id_raw(&state.db, parent_comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    if parent.post_id != post_id {
        return Err(AppError::field(
            "commentId",
            "Comment does not belong to this post",
        ));
    }

    let row = sqlx::query_as::<_, CommentCommentRow>(
        r#"
        INSERT INTO comment_comments (id, content, author_id, post_id, parent_comment_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, content, author_id, post_id, parent_comment_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&request.content)
    .bind(author_id)
    .bind(post_id)
    .bind(parent.id)
    .bind(Utc::now())
    .fetch_one(&state.db)
    .await?;

    let comment = Comment::from(row);
    tracing::info!(
        comment_id = %comment.id,
        parent_id = %parent.id,
        parent_kind = ?parent.kind(),
        "Reply created"
    );

    fresh_node(state, &comment).await
}
