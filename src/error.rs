//! Application error types and handling

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use minijinja::HtmlEscape;
use thiserror::Error;
use tracing::error;

use crate::query::QueryError;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TemplateError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        // Rendered as a fragment so htmx can swap it into the page
        let body = Html(format!(
            r#"<div class="error" role="alert">{}</div>"#,
            HtmlEscape(&self.to_string())
        ));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        AppError::TemplateError(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}
