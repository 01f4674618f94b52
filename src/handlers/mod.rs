pub mod comments;
pub mod health;
pub mod posts;

use crate::{
    error::{AppError, Result},
    models::VoteDirection,
};

pub(crate) fn parse_vote(vote: &str) -> Result<VoteDirection> {
    vote.parse()
        .map_err(|_| AppError::field("vote", "Vote must be \"up\" or \"down\""))
}
