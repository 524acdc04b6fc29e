use crate::{
    auth::AuthenticatedUser,
    daily::{day_key, featured_of_day},
    errors::AppError,
    likes::toggle_like,
    models::{ArtifactFilter, ArtifactPatch, NewArtifact, SortKey},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing;
use uuid::Uuid;

#[derive(Deserialize, Debug, Default)]
pub struct ListQuery {
    pub sort: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct EmailQuery {
    pub email: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    #[serde(default)]
    pub user_email: String,
}

pub async fn root() -> &'static str {
    "Welcome to Histo Track"
}

/// GET /allArtifacts
pub async fn list_artifacts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    // Unknown keys fall back to store order rather than failing the request.
    let sort = query.sort.as_deref().and_then(|s| s.parse::<SortKey>().ok());
    tracing::debug!(?sort, "Listing all artifacts via handler");
    let artifacts = state.artifact_repo.list_all(sort).await?;
    tracing::info!("Handler successfully retrieved {} artifacts", artifacts.len());
    Ok(Json(artifacts))
}

/// GET /featuredArtifacts
pub async fn featured_artifacts(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let mut artifacts = state.artifact_repo.list_all(Some(SortKey::LikesDesc)).await?;
    artifacts.truncate(state.featured_limit);
    Ok(Json(artifacts))
}

/// GET /dailyArtifact
pub async fn daily_artifact(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let today = day_key(Utc::now());
    let artifact = featured_of_day(state.artifact_repo.as_ref(), state.pick_repo.as_ref(), today).await?;
    Ok(Json(artifact))
}

/// GET /artifact/{id}
pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let artifact_id = Uuid::parse_str(&id_str)?;
    tracing::debug!(%artifact_id, "Fetching artifact details via handler");
    let artifact = state
        .artifact_repo
        .get_by_id(artifact_id)
        .await?
        .ok_or(AppError::ArtifactNotFound(artifact_id))?;
    Ok(Json(artifact))
}

/// GET /liked-artifacts?email=
pub async fn liked_artifacts(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<EmailQuery>,
) -> Result<impl IntoResponse, AppError> {
    user.ensure_email(query.email.as_deref())?;
    let artifacts = state
        .artifact_repo
        .list_where(&ArtifactFilter::LikedBy(user.0.email.clone()))
        .await?;
    Ok(Json(artifacts))
}

/// GET /myArtifacts?email=
pub async fn my_artifacts(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<EmailQuery>,
) -> Result<impl IntoResponse, AppError> {
    user.ensure_email(query.email.as_deref())?;
    let artifacts = state
        .artifact_repo
        .list_where(&ArtifactFilter::OwnedBy(user.0.email.clone()))
        .await?;
    Ok(Json(artifacts))
}

/// POST /allArtifacts
pub async fn create_artifact(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewArtifact>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    let artifact = body.into_artifact();
    state.artifact_repo.insert(&artifact).await?;
    tracing::info!(artifact_id = %artifact.id, "Artifact created successfully via handler");
    Ok((StatusCode::CREATED, Json(artifact)))
}

/// PATCH /artifact/{id}
pub async fn toggle_artifact_like(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    body: Result<Json<LikeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let artifact_id = Uuid::parse_str(&id_str)?;
    let Json(body) = body?;
    let identity = body.user_email.trim();
    if identity.is_empty() {
        return Err(AppError::InvalidInput("userEmail is required".to_string()));
    }
    let artifact = toggle_like(state.artifact_repo.as_ref(), artifact_id, identity).await?;
    Ok(Json(artifact))
}

/// PATCH /updateArtifact/{id}
pub async fn update_artifact(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    user: AuthenticatedUser,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let artifact_id = Uuid::parse_str(&id_str)?;
    let Json(body) = body?;
    let patch = ArtifactPatch::new(body).map_err(AppError::InvalidInput)?;
    let existing = state
        .artifact_repo
        .get_by_id(artifact_id)
        .await?
        .ok_or(AppError::ArtifactNotFound(artifact_id))?;

    if existing.owner_email != user.0.email {
        tracing::warn!(%artifact_id, caller = %user.0.email, "Update rejected: caller is not the owner");
        return Err(AppError::Forbidden(format!(
            "{} does not own artifact {}",
            user.0.email, artifact_id
        )));
    }

    let updated = state
        .artifact_repo
        .update_fields(artifact_id, &patch)
        .await?
        .ok_or(AppError::ArtifactNotFound(artifact_id))?;
    tracing::info!(%artifact_id, fields = patch.fields.len(), "Artifact updated via handler");
    Ok(Json(updated))
}

/// DELETE /allArtifacts/{id}
///
/// Unconditional; deleting an unknown id reports a count of zero.
pub async fn delete_artifact(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let artifact_id = Uuid::parse_str(&id_str)?;
    tracing::debug!(%artifact_id, "Deleting artifact via handler");
    let deleted_count = state.artifact_repo.delete(artifact_id).await?;
    tracing::info!(%artifact_id, deleted_count, "Artifact delete handled");
    Ok(Json(json!({ "deletedCount": deleted_count })))
}
