use crate::{
    domain::{ArtifactRepository, DailyPickRepository},
    errors::RepoError,
    models::{Artifact, ArtifactFilter, ArtifactPatch, DailyPick, LikeAction, LikeWrite, PickInsert, SortKey},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing;
use uuid::Uuid;

/// Process-local artifact store. Insertion order is the natural order.
#[derive(Debug, Default)]
pub struct InMemoryArtifactRepository {
    artifacts: RwLock<Vec<Artifact>>,
}

impl InMemoryArtifactRepository {
    pub fn new() -> Self {
        tracing::info!("Initializing InMemoryArtifactRepository");
        Self::default()
    }
}

#[async_trait]
impl ArtifactRepository for InMemoryArtifactRepository {
    async fn list_all(&self, sort: Option<SortKey>) -> Result<Vec<Artifact>, RepoError> {
        let mut artifacts = self.artifacts.read().await.clone();
        if let Some(key) = sort {
            key.sort(&mut artifacts);
        }
        Ok(artifacts)
    }

    async fn list_where(&self, filter: &ArtifactFilter) -> Result<Vec<Artifact>, RepoError> {
        let artifacts = self.artifacts.read().await;
        Ok(artifacts.iter().filter(|a| filter.matches(a)).cloned().collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Artifact>, RepoError> {
        let artifacts = self.artifacts.read().await;
        Ok(artifacts.iter().find(|a| a.id == id).cloned())
    }

    async fn sample_random(&self, n: usize) -> Result<Vec<Artifact>, RepoError> {
        let artifacts = self.artifacts.read().await;
        let mut rng = rand::thread_rng();
        Ok(artifacts.choose_multiple(&mut rng, n).cloned().collect())
    }

    async fn insert(&self, artifact: &Artifact) -> Result<Uuid, RepoError> {
        self.artifacts.write().await.push(artifact.clone());
        Ok(artifact.id)
    }

    async fn update_fields(&self, id: Uuid, patch: &ArtifactPatch) -> Result<Option<Artifact>, RepoError> {
        let mut artifacts = self.artifacts.write().await;
        Ok(artifacts.iter_mut().find(|a| a.id == id).map(|artifact| {
            artifact.apply_patch(patch);
            artifact.clone()
        }))
    }

    async fn apply_like(&self, id: Uuid, identity: &str, action: LikeAction) -> Result<LikeWrite, RepoError> {
        let mut artifacts = self.artifacts.write().await;
        let Some(artifact) = artifacts.iter_mut().find(|a| a.id == id) else {
            return Ok(LikeWrite::Missing);
        };
        match action {
            LikeAction::Add => {
                if !artifact.liked_by.insert(identity.to_string()) {
                    return Ok(LikeWrite::Stale);
                }
                artifact.total_liked += 1;
            }
            LikeAction::Remove => {
                if !artifact.liked_by.remove(identity) {
                    return Ok(LikeWrite::Stale);
                }
                artifact.total_liked = artifact.total_liked.saturating_sub(1);
            }
        }
        Ok(LikeWrite::Applied(artifact.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<u64, RepoError> {
        let mut artifacts = self.artifacts.write().await;
        let before = artifacts.len();
        artifacts.retain(|a| a.id != id);
        Ok((before - artifacts.len()) as u64)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDailyPickRepository {
    picks: RwLock<HashMap<NaiveDate, DailyPick>>,
}

impl InMemoryDailyPickRepository {
    pub fn new() -> Self {
        tracing::info!("Initializing InMemoryDailyPickRepository");
        Self::default()
    }
}

#[async_trait]
impl DailyPickRepository for InMemoryDailyPickRepository {
    async fn get(&self, date: NaiveDate) -> Result<Option<DailyPick>, RepoError> {
        Ok(self.picks.read().await.get(&date).copied())
    }

    async fn insert_if_absent(&self, pick: &DailyPick) -> Result<PickInsert, RepoError> {
        let mut picks = self.picks.write().await;
        match picks.get(&pick.date) {
            Some(existing) => Ok(PickInsert::AlreadyExists(*existing)),
            None => {
                picks.insert(pick.date, *pick);
                Ok(PickInsert::Inserted)
            }
        }
    }
}
