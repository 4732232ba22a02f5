use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{FollowOutcome, FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// What happened to a follow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowResult {
    Created,
    AlreadyFollowing,
    /// The user asked to follow themselves; nothing was written.
    SelfFollowSkipped,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    async fn author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("user", username).into())
    }

    /// Get-or-create of the `user -> author` edge.
    pub async fn follow(
        &self,
        user: &UserRecord,
        author_username: &str,
    ) -> Result<FollowResult, FollowError> {
        let author = self.author(author_username).await?;
        if author.id == user.id {
            return Ok(FollowResult::SelfFollowSkipped);
        }

        let outcome = self.follows.follow(user.id, author.id).await?;
        info!(
            target = "postboard::application::follows",
            user = %user.username,
            author = %author.username,
            created = outcome == FollowOutcome::Created,
            "follow requested"
        );
        Ok(match outcome {
            FollowOutcome::Created => FollowResult::Created,
            FollowOutcome::Existing => FollowResult::AlreadyFollowing,
        })
    }

    pub async fn unfollow(
        &self,
        user: &UserRecord,
        author_username: &str,
    ) -> Result<(), FollowError> {
        let not_following =
            || DomainError::not_found("follow", format!("{} -> {author_username}", user.username));
        let author = self
            .users
            .find_by_username(author_username)
            .await?
            .ok_or_else(not_following)?;

        if !self.follows.unfollow(user.id, author.id).await? {
            return Err(not_following().into());
        }
        info!(
            target = "postboard::application::follows",
            user = %user.username,
            author = %author.username,
            "unfollowed"
        );
        Ok(())
    }
}
