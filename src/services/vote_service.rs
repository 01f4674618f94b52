use std::collections::HashMap;

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        VotableKind, Vote, VoteDirection, VoteLedger, VoteProjection, VoteResponse, VoteTarget,
    },
};

fn table_for(kind: VotableKind) -> &'static str {
    match kind {
        VotableKind::Post => "posts",
        VotableKind::PostComment => "post_comments",
        VotableKind::CommentComment => "comment_comments",
    }
}

fn not_found(target: VoteTarget) -> AppError {
    match target {
        VoteTarget::Post(_) => AppError::NotFound("Post not found".to_string()),
        VoteTarget::Comment { .. } => AppError::NotFound("Comment not found".to_string()),
    }
}

pub async fn votable_exists<'e>(executor: impl PgExecutor<'e>, target: VoteTarget) -> Result<bool> {
    let query = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
        table_for(target.votable_kind())
    );
    let exists = sqlx::query_scalar::<_, bool>(&query)
        .bind(target.id())
        .fetch_one(executor)
        .await?;

    Ok(exists)
}

pub async fn load_ledger<'e>(
    executor: impl PgExecutor<'e>,
    target: VoteTarget,
) -> Result<VoteLedger> {
    let votes = sqlx::query_as::<_, Vote>(
        r#"
        SELECT id, votable_kind, votable_id, voter_id, direction, created_at
        FROM votes
        WHERE votable_kind = $1 AND votable_id = $2
        "#,
    )
    .bind(target.votable_kind())
    .bind(target.id())
    .fetch_all(executor)
    .await?;

    Ok(VoteLedger::from_votes(&votes))
}

/// Loads the ledgers of many votables of one kind in a single query.
pub async fn load_ledgers(
    db: &PgPool,
    kind: VotableKind,
    votable_ids: &[Uuid],
) -> Result<HashMap<Uuid, VoteLedger>> {
    if votable_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let votes = sqlx::query_as::<_, Vote>(
        r#"
        SELECT id, votable_kind, votable_id, voter_id, direction, created_at
        FROM votes
        WHERE votable_kind = $1 AND votable_id = ANY($2)
        "#,
    )
    .bind(kind)
    .bind(votable_ids)
    .fetch_all(db)
    .await?;

    Ok(VoteLedger::group_by_votable(&votes))
}

/// Records `direction` for `voter_id`. Each voter holds one row per votable,
/// so a flip rewrites the direction in place.
pub async fn cast_vote(
    db: &PgPool,
    target: VoteTarget,
    voter_id: &str,
    direction: VoteDirection,
) -> Result<VoteProjection> {
    let mut tx = db.begin().await?;

    if !votable_exists(&mut *tx, target).await? {
        return Err(not_found(target));
    }

    sqlx::query(
        r#"
        INSERT INTO votes (id, votable_kind, votable_id, voter_id, direction, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
        ON CONFLICT (votable_kind, votable_id, voter_id)
        DO UPDATE SET direction = EXCLUDED.direction, updated_at = NOW()
        WHERE votes.direction <> EXCLUDED.direction
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(target.votable_kind())
    .bind(target.id())
    .bind(voter_id)
    .bind(direction)
    .execute(&mut *tx)
    .await?;

    let ledger = load_ledger(&mut *tx, target).await?;

    tx.commit().await?;

    Ok(ledger.project(Some(voter_id)))
}

/// Entry point for vote requests. A vote the voter already holds is
/// answered with the current state and never reaches the ledger.
pub async fn vote(
    db: &PgPool,
    target: VoteTarget,
    voter_id: &str,
    direction: VoteDirection,
) -> Result<VoteResponse> {
    if !votable_exists(db, target).await? {
        return Err(not_found(target));
    }

    let ledger = load_ledger(db, target).await?;
    let transition = ledger.plan(voter_id, direction);

    if !transition.insert {
        tracing::debug!(
            votable_id = %target.id(),
            voter_id,
            ?direction,
            "Ignoring repeated vote"
        );
        return Ok(VoteResponse {
            id: target.id(),
            projection: ledger.project(Some(voter_id)),
            changed: false,
        });
    }

    let projection = cast_vote(db, target, voter_id, direction).await?;
    tracing::info!(
        votable_id = %target.id(),
        voter_id,
        ?direction,
        flipped = transition.remove_opposite,
        "Vote recorded"
    );

    Ok(VoteResponse {
        id: target.id(),
        projection,
        changed: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommentKind;

    #[test]
    fn every_kind_maps_to_its_own_table() {
        let id = Uuid::new_v4();
        let tables: Vec<_> = [
            VoteTarget::Post(id),
            VoteTarget::Comment {
                kind: CommentKind::Post,
                id,
            },
            VoteTarget::Comment {
                kind: CommentKind::Comment,
                id,
            },
        ]
        .into_iter()
        .map(|target| table_for(target.votable_kind()))
        .collect();

        assert_eq!(tables, ["posts", "post_comments", "comment_comments"]);
    }

    #[test]
    fn not_found_names_the_target() {
        let id = Uuid::new_v4();
        assert!(matches!(
            not_found(VoteTarget::Post(id)),
            AppError::NotFound(ref m) if m == "Post not found"
        ));
        assert!(matches!(
            not_found(VoteTarget::Comment { kind: CommentKind::Comment, id }),
            AppError::NotFound(ref m) if m == "Comment not found"
        ));
    }
}
