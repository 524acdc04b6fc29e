//! Like toggling for an (artifact, identity) pair.

use crate::{
    domain::ArtifactRepository,
    errors::AppError,
    models::{Artifact, LikeAction, LikeWrite},
};
use tracing;
use uuid::Uuid;

/// How many times a toggle re-reads after losing a race before giving up.
pub const MAX_TOGGLE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeState {
    NotLiked,
    Liked,
}

impl LikeState {
    pub fn of(artifact: &Artifact, identity: &str) -> Self {
        if artifact.is_liked_by(identity) {
            LikeState::Liked
        } else {
            LikeState::NotLiked
        }
    }

    /// The write that moves this state to the other one.
    pub fn toggle_action(self) -> LikeAction {
        match self {
            LikeState::NotLiked => LikeAction::Add,
            LikeState::Liked => LikeAction::Remove,
        }
    }
}

/// Flips whether `identity` likes the artifact and returns the updated record.
///
/// Reads the current membership, then issues a write conditioned on that membership.
/// If another toggle got there first the write is refused and the read is repeated.
pub async fn toggle_like(
    repo: &dyn ArtifactRepository,
    artifact_id: Uuid,
    identity: &str,
) -> Result<Artifact, AppError> {
    for attempt in 1..=MAX_TOGGLE_ATTEMPTS {
        let artifact = repo
            .get_by_id(artifact_id)
            .await?
            .ok_or(AppError::ArtifactNotFound(artifact_id))?;
        let action = LikeState::of(&artifact, identity).toggle_action();

        match repo.apply_like(artifact_id, identity, action).await? {
            LikeWrite::Applied(updated) => {
                tracing::info!(%artifact_id, ?action, total_liked = updated.total_liked, "Like toggled");
                return Ok(updated);
            }
            LikeWrite::Stale => {
                tracing::debug!(%artifact_id, attempt, "Like membership changed concurrently, retrying");
            }
            LikeWrite::Missing => return Err(AppError::ArtifactNotFound(artifact_id)),
        }
    }

    tracing::warn!(%artifact_id, "Gave up toggling like after repeated concurrent updates");
    Err(AppError::Conflict(format!(
        "Artifact {} is being updated concurrently, try again",
        artifact_id
    )))
}
