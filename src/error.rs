use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

use crate::ui;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Data file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported data file version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,
    #[error("Username {0} is already taken")]
    UsernameTaken(String),
    #[error("Password hashing failed: {0}")]
    PasswordHash(argon2::password_hash::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, Html(ui::not_found().into_string())).into_response()
            }
            AppError::UsernameTaken(_) => (StatusCode::CONFLICT, self.to_string()).into_response(),
            AppError::Storage(_) | AppError::PasswordHash(_) | AppError::Task(_) => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(ui::server_error().into_string()),
                )
                    .into_response()
            }
        }
    }
}
