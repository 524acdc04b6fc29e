use crate::errors::{AuthError, RepoError};
use crate::models::{
    Artifact, ArtifactFilter, ArtifactPatch, DailyPick, LikeAction, LikeWrite, PickInsert, SortKey,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

/// Trait defining operations on the artifact catalog.
#[async_trait]
pub trait ArtifactRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Lists every artifact. `None` keeps the store's natural order.
    async fn list_all(&self, sort: Option<SortKey>) -> Result<Vec<Artifact>, RepoError>;

    async fn list_where(&self, filter: &ArtifactFilter) -> Result<Vec<Artifact>, RepoError>;

    /// Returns Ok(None) if the artifact is not found.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Artifact>, RepoError>;

    /// Uniform sample without replacement. Returns fewer than `n` when the catalog is smaller.
    async fn sample_random(&self, n: usize) -> Result<Vec<Artifact>, RepoError>;

    async fn insert(&self, artifact: &Artifact) -> Result<Uuid, RepoError>;

    /// Merges `patch` into an existing artifact. Returns Ok(None) if it does not exist.
    async fn update_fields(&self, id: Uuid, patch: &ArtifactPatch) -> Result<Option<Artifact>, RepoError>;

    /// Atomically moves `identity` into or out of `likedBy` and adjusts `totalLiked` by one.
    ///
    /// The write only happens if membership is still the opposite of `action`, so two
    /// callers racing on the same observation cannot both apply it.
    async fn apply_like(&self, id: Uuid, identity: &str, action: LikeAction) -> Result<LikeWrite, RepoError>;

    /// Returns the number of artifacts removed (0 or 1).
    async fn delete(&self, id: Uuid) -> Result<u64, RepoError>;
}

/// Trait defining the per-day featured artifact memo.
#[async_trait]
pub trait DailyPickRepository: Send + Sync + 'static {
    async fn get(&self, date: NaiveDate) -> Result<Option<DailyPick>, RepoError>;

    /// Writes `pick` unless one already exists for its date, in which case the existing
    /// pick is returned untouched.
    async fn insert_if_absent(&self, pick: &DailyPick) -> Result<PickInsert, RepoError>;
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub email: String,
}

/// Validates a bearer credential into an identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
