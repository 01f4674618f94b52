use std::collections::HashMap;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
    identity::{self, require_author},
    models::{
        Author, CreatePostRequest, POST_FETCH_LIMIT, Post, PostView, PostWithAuthor, VotableKind,
        VoteLedger, VoteTarget,
    },
    services::vote_service,
};

pub async fn get_post_by_id_raw(db: &PgPool, post_id: Uuid) -> Result<Option<Post>> {
    let post = sqlx::query_as::<_, Post>(
        "SELECT id, title, content, author_id, created_at FROM posts WHERE id = $1",
    )
    .bind(post_id)
    .fetch_optional(db)
    .await?;

    Ok(post)
}

/// Pairs each post with its author and the viewer's vote state.
pub fn attach_authors(
    posts: Vec<Post>,
    ledgers: &HashMap<Uuid, VoteLedger>,
    authors: &HashMap<String, Author>,
    viewer_id: Option<&str>,
) -> Result<Vec<PostWithAuthor>> {
    posts
        .into_iter()
        .map(|post| {
            let author = require_author(authors, &post.author_id, "post")?;
            let votes = ledgers
                .get(&post.id)
                .map(|ledger| ledger.project(viewer_id))
                .unwrap_or_default();

            Ok(PostWithAuthor {
                post: PostView { post, votes },
                author,
            })
        })
        .collect()
}

pub async fn get_posts(state: &AppState, viewer_id: Option<&str>) -> Result<Vec<PostWithAuthor>> {
    let posts = sqlx::query_as::<_, Post>(
        r#"
        SELECT id, title, content, author_id, created_at
        FROM posts
        ORDER BY created_at DESC, id DESC
        LIMIT $1
        "#,
    )
    .bind(POST_FETCH_LIMIT)
    .fetch_all(&state.db)
    .await?;

    let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let ledgers = vote_service::load_ledgers(&state.db, VotableKind::Post, &post_ids).await?;

    let authors = identity::resolve_authors(
        state.identity.as_ref(),
        posts.iter().map(|post| post.author_id.as_str()),
        state.config.identity_page_limit,
    )
    .await?;

    attach_authors(posts, &ledgers, &authors, viewer_id)
}

pub async fn get_post(
    state: &AppState,
    post_id: Uuid,
    viewer_id: Option<&str>,
) -> Result<PostWithAuthor> {
    let post = get_post_by_id_raw(&state.db, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let ledger = vote_service::load_ledger(&state.db, VoteTarget::Post(post_id)).await?;

    let author = state
        .identity
        .get_user(&post.author_id)
        .await?
        .map(identity::filter_user_for_client)
        .filter(Author::is_resolvable)
        .ok_or_else(|| AppError::Internal("Author for post not found".to_string()))?;

    Ok(PostWithAuthor {
        post: PostView {
            votes: ledger.project(viewer_id),
            post,
        },
        author,
    })
}

pub async fn create_post(
    db: &PgPool,
    author_id: &str,
    request: &CreatePostRequest,
) -> Result<Post> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (id, title, content, author_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, title, content, author_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&request.title)
    .bind(&request.content)
    .bind(author_id)
    .bind(Utc::now())
    .fetch_one(db)
    .await?;

    tracing::info!(post_id = %post.id, author_id, "Post created");

    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VoteDirection;

    fn post(author_id: &str) -> Post {
        Post {
            id: Uuid::new_v4(),
            title: "Title".to_string(),
            content: "Body".to_string(),
            author_id: author_id.to_string(),
            created_at: Utc::now(),
        }
    }

    fn author(id: &str, username: Option<&str>) -> Author {
        Author {
            id: id.to_string(),
            username: username.map(str::to_string),
            image_url: String::new(),
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn posts_keep_order_and_carry_votes() {
        let first = post("user_a");
        let second = post("user_b");
        let mut ledgers = HashMap::new();
        let mut ledger = VoteLedger::new();
        ledger.cast("user_b", VoteDirection::Down);
        ledgers.insert(second.id, ledger);

        let mut authors = HashMap::new();
        authors.insert("user_a".to_string(), author("user_a", Some("alice")));
        authors.insert("user_b".to_string(), author("user_b", Some("bob")));

        let listed = attach_authors(
            vec![first.clone(), second.clone()],
            &ledgers,
            &authors,
            Some("user_b"),
        )
        .unwrap();

        assert_eq!(listed[0].post.post.id, first.id);
        assert_eq!(listed[0].post.votes.rating, 0);
        assert_eq!(listed[1].author.username.as_deref(), Some("bob"));
        assert_eq!(listed[1].post.votes.rating, -1);
        assert!(listed[1].post.votes.down_vote);
    }

    #[test]
    fn post_without_displayable_author_fails() {
        let mut authors = HashMap::new();
        authors.insert("user_a".to_string(), author("user_a", None));

        let result = attach_authors(vec![post("user_a")], &HashMap::new(), &authors, None);
        assert!(matches!(
            result,
            Err(AppError::Internal(ref m)) if m == "Author for post not found"
        ));
    }
}
