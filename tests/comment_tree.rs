//! End-to-end walk through thread building: a post gains a comment, then a
//! reply, with authors resolved through the identity provider.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use threadvote::{
    error::AppError,
    identity::{MockIdentityProvider, resolve_authors},
    models::{Comment, CommentKind, CommentParent, UserRecord, VoteDirection, VoteLedger},
    services::comment_service::assemble_comment_tree,
};
use uuid::Uuid;

fn user(id: &str, username: &str) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        username: Some(username.to_string()),
        image_url: format!("https://img.example/{}.png", id),
        first_name: None,
        last_name: None,
    }
}

fn comment(post_id: Uuid, author: &str, parent: CommentParent, seconds: i64) -> Comment {
    Comment {
        id: Uuid::new_v4(),
        content: "Nice post".to_string(),
        author_id: author.to_string(),
        post_id,
        parent,
        created_at: DateTime::<Utc>::from_timestamp(1_700_000_000 + seconds, 0).unwrap(),
    }
}

async fn build(
    identity: &MockIdentityProvider,
    top_level: &[Comment],
    replies: &[Comment],
    ledgers: &HashMap<Uuid, VoteLedger>,
    viewer: Option<&str>,
) -> Result<Vec<threadvote::models::CommentNode>, AppError> {
    let authors = resolve_authors(
        identity,
        top_level
            .iter()
            .chain(replies)
            .map(|c| c.author_id.as_str()),
        100,
    )
    .await?;
    assemble_comment_tree(top_level, replies, ledgers, &authors, viewer)
}

#[tokio::test]
async fn thread_grows_comment_then_reply() {
    let identity = MockIdentityProvider::with_users([user("a1", "alice"), user("a2", "bob")]);
    let post_id = Uuid::new_v4();
    let no_votes = HashMap::new();

    let tree = build(&identity, &[], &[], &no_votes, None).await.unwrap();
    assert!(tree.is_empty());

    let c1 = comment(post_id, "a1", CommentParent::Post, 0);
    let tree = build(&identity, &[c1.clone()], &[], &no_votes, None)
        .await
        .unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].comment.id, c1.id);
    assert_eq!(tree[0].comment.votes.rating, 0);
    assert_eq!(tree[0].author.id, "a1");

    let r1 = comment(post_id, "a2", CommentParent::Comment(c1.id), 30);
    let tree = build(&identity, &[c1.clone()], &[r1.clone()], &no_votes, None)
        .await
        .unwrap();
    let replies = &tree[0].comment.comments;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].comment.id, r1.id);
    assert_eq!(replies[0].author.id, "a2");
    assert_eq!(replies[0].comment.comment_type, CommentKind::Comment);

    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(json[0]["comment"]["commentType"], "post");
    assert_eq!(json[0]["comment"]["comments"][0]["comment"]["commentType"], "comment");
    assert_eq!(json[0]["comment"]["comments"][0]["author"]["username"], "bob");
}

#[tokio::test]
async fn unknown_author_fails_without_partial_tree() {
    let identity = MockIdentityProvider::with_users([user("a1", "alice")]);
    let post_id = Uuid::new_v4();
    let c1 = comment(post_id, "a1", CommentParent::Post, 0);
    let r1 = comment(post_id, "departed", CommentParent::Comment(c1.id), 1);

    let result = build(&identity, &[c1], &[r1], &HashMap::new(), None).await;

    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[tokio::test]
async fn repeated_vote_leaves_rating_unchanged() {
    let identity = MockIdentityProvider::with_users([user("a1", "alice")]);
    let post_id = Uuid::new_v4();
    let c1 = comment(post_id, "a1", CommentParent::Post, 0);

    let mut ledger = VoteLedger::new();
    ledger.cast("viewer", VoteDirection::Up);
    let before = ledger.clone();

    let transition = ledger.plan("viewer", VoteDirection::Up);
    assert!(transition.is_noop());
    ledger.apply(&transition);
    assert_eq!(ledger, before);

    let mut ledgers = HashMap::new();
    ledgers.insert(c1.id, ledger);
    let tree = build(&identity, &[c1], &[], &ledgers, Some("viewer"))
        .await
        .unwrap();

    assert_eq!(tree[0].comment.votes.rating, 1);
    assert!(tree[0].comment.votes.up_vote);
    assert!(!tree[0].comment.votes.down_vote);
}

#[tokio::test]
async fn flipping_a_vote_moves_it_between_directions() {
    let identity = MockIdentityProvider::with_users([user("a1", "alice")]);
    let post_id = Uuid::new_v4();
    let c1 = comment(post_id, "a1", CommentParent::Post, 0);

    let mut ledger = VoteLedger::new();
    ledger.cast("viewer", VoteDirection::Up);
    ledger.cast("viewer", VoteDirection::Down);
    ledger.cast("someone", VoteDirection::Down);

    let mut ledgers = HashMap::new();
    ledgers.insert(c1.id, ledger);
    let tree = build(&identity, &[c1], &[], &ledgers, Some("viewer"))
        .await
        .unwrap();

    let votes = tree[0].comment.votes;
    assert_eq!(votes.rating, -2);
    assert!(!votes.up_vote);
    assert!(votes.down_vote);
}
