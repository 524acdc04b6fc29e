//! The featured artifact of the day.
//!
//! The first request for a UTC date draws one artifact at random and records the
//! choice; every later request for that date gets the recorded artifact back. Two
//! first requests racing each other are settled by the store refusing a second pick
//! for the same date, after which the loser serves the winner's pick.

use crate::{
    domain::{ArtifactRepository, DailyPickRepository},
    errors::AppError,
    models::{Artifact, DailyPick, PickInsert},
};
use chrono::{DateTime, NaiveDate, Utc};
use tracing;

/// Calendar-day key for an instant, always in UTC.
pub fn day_key(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

pub async fn featured_of_day(
    artifacts: &dyn ArtifactRepository,
    picks: &dyn DailyPickRepository,
    today: NaiveDate,
) -> Result<Artifact, AppError> {
    if let Some(pick) = picks.get(today).await? {
        tracing::debug!(date = %today, artifact_id = %pick.artifact_id, "Serving memoized daily pick");
        return resolve(artifacts, pick).await;
    }

    let Some(drawn) = artifacts.sample_random(1).await?.into_iter().next() else {
        tracing::info!(date = %today, "No artifacts to feature");
        return Err(AppError::NoArtifacts);
    };

    let pick = DailyPick {
        date: today,
        artifact_id: drawn.id,
    };
    match picks.insert_if_absent(&pick).await? {
        PickInsert::Inserted => {
            tracing::info!(date = %today, artifact_id = %drawn.id, "Recorded new daily pick");
            Ok(drawn)
        }
        PickInsert::AlreadyExists(existing) => {
            tracing::debug!(date = %today, artifact_id = %existing.artifact_id, "Lost daily pick race, using existing pick");
            resolve(artifacts, existing).await
        }
    }
}

async fn resolve(artifacts: &dyn ArtifactRepository, pick: DailyPick) -> Result<Artifact, AppError> {
    artifacts
        .get_by_id(pick.artifact_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(date = %pick.date, artifact_id = %pick.artifact_id, "Daily pick refers to a deleted artifact");
            AppError::DanglingDailyPick {
                date: pick.date,
                artifact_id: pick.artifact_id,
            }
        })
}
