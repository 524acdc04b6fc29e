use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

/// Keys a client may never set directly, either on create or on update.
pub const PROTECTED_KEYS: [&str; 3] = ["_id", "likedBy", "totalLiked"];

/// One catalog record.
///
/// Anything beyond the fields the service reads is kept verbatim in `details`
/// and flattened back out on serialization.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner_email: String,
    #[serde(default)]
    pub total_liked: u64,
    #[serde(default)]
    pub liked_by: BTreeSet<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Artifact {
    pub fn is_liked_by(&self, identity: &str) -> bool {
        self.liked_by.contains(identity)
    }

    /// Merges `patch` into the record. Top-level keys overwrite, everything else stays.
    pub fn apply_patch(&mut self, patch: &ArtifactPatch) {
        for (key, value) in &patch.fields {
            match key.as_str() {
                "name" => self.name = value.as_str().unwrap_or_default().to_string(),
                _ => {
                    self.details.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// Body of `POST /allArtifacts`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewArtifact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner_email: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl NewArtifact {
    /// Assigns a fresh id and an empty like state.
    pub fn into_artifact(self) -> Artifact {
        let mut details = self.details;
        for key in PROTECTED_KEYS {
            details.remove(key);
        }
        Artifact {
            id: Uuid::new_v4(),
            name: self.name,
            owner_email: self.owner_email,
            total_liked: 0,
            liked_by: BTreeSet::new(),
            details,
        }
    }
}

/// Merge patch for `PATCH /updateArtifact/{id}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactPatch {
    pub fields: Map<String, Value>,
}

impl ArtifactPatch {
    /// Builds a patch, dropping keys that would break identity, ownership or the like counter.
    ///
    /// Fails when `name` is present but not a string.
    pub fn new(mut fields: Map<String, Value>) -> Result<Self, String> {
        for key in PROTECTED_KEYS.iter().copied().chain(["ownerEmail"]) {
            fields.remove(key);
        }
        if fields.get("name").is_some_and(|name| !name.is_string()) {
            return Err("name must be a string".to_string());
        }
        Ok(Self { fields })
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The memoized featured artifact for one UTC day.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPick {
    pub date: NaiveDate,
    pub artifact_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    NameAsc,
    NameDesc,
    LikesAsc,
    LikesDesc,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name-asc" => Ok(SortKey::NameAsc),
            "name-desc" => Ok(SortKey::NameDesc),
            "likes-asc" => Ok(SortKey::LikesAsc),
            "likes-desc" => Ok(SortKey::LikesDesc),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

impl SortKey {
    /// Sorts in place. Stable, so ties keep store order.
    pub fn sort(self, artifacts: &mut [Artifact]) {
        match self {
            SortKey::NameAsc => artifacts.sort_by(|a, b| a.name.cmp(&b.name)),
            SortKey::NameDesc => artifacts.sort_by(|a, b| b.name.cmp(&a.name)),
            SortKey::LikesAsc => artifacts.sort_by_key(|a| a.total_liked),
            SortKey::LikesDesc => artifacts.sort_by(|a, b| b.total_liked.cmp(&a.total_liked)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactFilter {
    LikedBy(String),
    OwnedBy(String),
}

impl ArtifactFilter {
    pub fn matches(&self, artifact: &Artifact) -> bool {
        match self {
            ArtifactFilter::LikedBy(email) => artifact.is_liked_by(email),
            ArtifactFilter::OwnedBy(email) => artifact.owner_email == *email,
        }
    }
}

/// Which way a like write moves the (artifact, identity) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Add,
    Remove,
}

/// Result of a conditional like write.
#[derive(Debug, Clone, PartialEq)]
pub enum LikeWrite {
    Applied(Artifact),
    /// Membership no longer matched what the caller observed.
    Stale,
    Missing,
}

/// Result of a conditional daily pick insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickInsert {
    Inserted,
    AlreadyExists(DailyPick),
}
