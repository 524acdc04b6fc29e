use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error),

    #[error("Stored data could not be decoded: {0}")]
    DataCorruption(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingCredential,
    #[error("Authorization header is not a Bearer credential")]
    MalformedCredential,
    #[error("Credential rejected: {0}")]
    Rejected(String),
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid artifact ID format: {0}")]
    InvalidUuid(#[from] uuid::Error),
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    // Identity errors
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Domain/Service level errors (mapped from RepoError)
    #[error("Artifact not found with ID: {0}")]
    ArtifactNotFound(Uuid),
    #[error("Artifact {artifact_id} featured for {date} no longer exists")]
    DanglingDailyPick { date: NaiveDate, artifact_id: Uuid },
    #[error("No artifacts available")]
    NoArtifacts,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Could not complete database operation")]
    RepositoryError(#[source] RepoError),

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),

    // Generic Internal Server Error
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

// --- Conversions from Domain Errors to AppError ---

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        AppError::RepositoryError(err)
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<aws_smithy_types::error::operation::BuildError> for AppError {
    fn from(err: aws_smithy_types::error::operation::BuildError) -> Self {
        AppError::InitError(format!("Failed to build DynamoDB request: {}", err))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::InvalidUuid(_) | AppError::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::ArtifactNotFound(_)
            | AppError::DanglingDailyPick { .. }
            | AppError::NoArtifacts => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RepositoryError(_)
            | AppError::ConfigError(_)
            | AppError::InitError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            // 4xx Client Errors
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::InvalidUuid(e) => format!("Invalid ID format: {}", e),
            AppError::InvalidBody(rejection) => format!("Invalid JSON body: {}", rejection.body_text()),
            AppError::Unauthorized(_) => "Unauthorized access".to_string(),
            AppError::Forbidden(_) => "Forbidden access".to_string(),
            AppError::ArtifactNotFound(id) => format!("Artifact not found with ID: {}", id),
            AppError::DanglingDailyPick { date, .. } => {
                format!("Featured artifact for {} is no longer available", date)
            }
            AppError::NoArtifacts => "No artifacts available".to_string(),
            AppError::Conflict(msg) => msg.clone(),

            // 5xx Server Errors
            AppError::RepositoryError(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                "Database operation failed".to_string()
            }
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                "Server configuration error".to_string()
            }
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                "Server initialization error".to_string()
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                "An internal server error occurred".to_string()
            }
        };

        tracing::error!(error.message = %error_message, error.status = %status, error.detail = %self, "Responding with error");

        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}
