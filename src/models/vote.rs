use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::CommentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "vote_direction", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn opposite(self) -> Self {
        match self {
            VoteDirection::Up => VoteDirection::Down,
            VoteDirection::Down => VoteDirection::Up,
        }
    }
}

impl FromStr for VoteDirection {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteDirection::Up),
            "down" => Ok(VoteDirection::Down),
            _ => Err(format!("Unknown vote direction: {}", s)),
        }
    }
}

/// Storage collection a vote row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "votable_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VotableKind {
    Post,
    PostComment,
    CommentComment,
}

impl From<CommentKind> for VotableKind {
    fn from(kind: CommentKind) -> Self {
        match kind {
            CommentKind::Post => VotableKind::PostComment,
            CommentKind::Comment => VotableKind::CommentComment,
        }
    }
}

/// Anything that can be voted on, addressed the way mutations route to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Post(Uuid),
    Comment { kind: CommentKind, id: Uuid },
}

impl VoteTarget {
    pub fn id(&self) -> Uuid {
        match self {
            VoteTarget::Post(id) => *id,
            VoteTarget::Comment { id, .. } => *id,
        }
    }

    pub fn votable_kind(&self) -> VotableKind {
        match self {
            VoteTarget::Post(_) => VotableKind::Post,
            VoteTarget::Comment { kind, .. } => (*kind).into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub votable_kind: VotableKind,
    pub votable_id: Uuid,
    pub voter_id: String,
    pub direction: VoteDirection,
    pub created_at: DateTime<Utc>,
}

/// Up and down votes held against a single votable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteLedger {
    up_votes: Vec<String>,
    down_votes: Vec<String>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_votes<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Self {
        let mut ledger = Self::new();
        for vote in votes {
            ledger.record(&vote.voter_id, vote.direction);
        }
        ledger
    }

    /// Groups vote rows by the votable they were cast on.
    pub fn group_by_votable(votes: &[Vote]) -> HashMap<Uuid, VoteLedger> {
        let mut ledgers: HashMap<Uuid, VoteLedger> = HashMap::new();
        for vote in votes {
            ledgers
                .entry(vote.votable_id)
                .or_default()
                .record(&vote.voter_id, vote.direction);
        }
        ledgers
    }

    fn record(&mut self, voter_id: &str, direction: VoteDirection) {
        let votes = self.votes_mut(direction);
        if !votes.iter().any(|v| v == voter_id) {
            votes.push(voter_id.to_string());
        }
    }

    fn votes(&self, direction: VoteDirection) -> &[String] {
        match direction {
            VoteDirection::Up => &self.up_votes,
            VoteDirection::Down => &self.down_votes,
        }
    }

    fn votes_mut(&mut self, direction: VoteDirection) -> &mut Vec<String> {
        match direction {
            VoteDirection::Up => &mut self.up_votes,
            VoteDirection::Down => &mut self.down_votes,
        }
    }

    pub fn holds(&self, voter_id: &str, direction: VoteDirection) -> bool {
        self.votes(direction).iter().any(|v| v == voter_id)
    }

    pub fn up_count(&self) -> usize {
        self.up_votes.len()
    }

    pub fn down_count(&self) -> usize {
        self.down_votes.len()
    }

    pub fn project(&self, viewer_id: Option<&str>) -> VoteProjection {
        let rating = self.up_votes.len() as i64 - self.down_votes.len() as i64;
        match viewer_id {
            Some(viewer_id) => VoteProjection {
                rating,
                up_vote: self.holds(viewer_id, VoteDirection::Up),
                down_vote: self.holds(viewer_id, VoteDirection::Down),
            },
            None => VoteProjection {
                rating,
                up_vote: false,
                down_vote: false,
            },
        }
    }

    /// Works out what casting `direction` for `voter_id` has to change.
    pub fn plan(&self, voter_id: &str, direction: VoteDirection) -> VoteTransition {
        VoteTransition {
            voter_id: voter_id.to_string(),
            direction,
            remove_opposite: self.holds(voter_id, direction.opposite()),
            insert: !self.holds(voter_id, direction),
        }
    }

    pub fn apply(&mut self, transition: &VoteTransition) {
        if transition.remove_opposite {
            self.votes_mut(transition.direction.opposite())
                .retain(|v| v != &transition.voter_id);
        }
        if transition.insert {
            self.record(&transition.voter_id, transition.direction);
        }
    }

    pub fn cast(&mut self, voter_id: &str, direction: VoteDirection) -> VoteProjection {
        let transition = self.plan(voter_id, direction);
        self.apply(&transition);
        self.project(Some(voter_id))
    }
}

/// The two steps of a vote toggle, executed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTransition {
    pub voter_id: String,
    pub direction: VoteDirection,
    pub remove_opposite: bool,
    pub insert: bool,
}

impl VoteTransition {
    pub fn is_noop(&self) -> bool {
        !self.remove_opposite && !self.insert
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteProjection {
    pub rating: i64,
    pub up_vote: bool,
    pub down_vote: bool,
}

// Vote on a post
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub vote: String,
}

// Vote on a comment; comment_type routes to the right table
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentVoteRequest {
    pub comment_type: String,
    pub vote: String,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub projection: VoteProjection,
    pub changed: bool,
}
