//! Application error types and HTTP response mapping.
//!
//! [`Error`] is the single error type handlers return. Its [`IntoResponse`]
//! implementation picks the HTTP status, logs at a severity matching how
//! actionable the failure is, and renders a body the frontend can use
//! directly (field-keyed messages for validation failures, friendly text for
//! constraint conflicts).

use crate::db::errors::DbError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("authentication required")]
    Unauthenticated { message: Option<String> },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// A request field failed validation. Rendered as a 422 with the message
    /// keyed under the offending field.
    #[error("validation failed on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// An email could not be handed to the transport. The recipient and
    /// transport kind are kept for the log line; the response stays generic.
    #[error("failed to deliver email to {email} via {transport}: {reason}")]
    Delivery {
        email: String,
        transport: &'static str,
        reason: anyhow::Error,
    },

    #[error("internal error during {operation}")]
    Internal { operation: String },

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Delivery { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller. Internal failures collapse to a generic
    /// string so driver details never leak into responses.
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message
                .clone()
                .unwrap_or_else(|| "Authentication required".to_string()),
            Error::Forbidden { message } => message.clone(),
            Error::BadRequest { message } => message.clone(),
            Error::Validation { message, .. } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} not found: {id}"),
            Error::Delivery { .. } => {
                "Failed to send email. Please try again later.".to_string()
            }
            Error::Database(DbError::UniqueViolation {
                table, constraint, ..
            }) => match (table.as_str(), constraint.as_str()) {
                ("accounts", "accounts_email_key") => {
                    "An account with this email address already exists".to_string()
                }
                ("categories", "categories_name_key") => {
                    "A category with this name already exists".to_string()
                }
                ("allocations", "allocations_open_tool_key") => {
                    "This tool is already checked out".to_string()
                }
                _ => "A record with these values already exists".to_string(),
            },
            Error::Database(DbError::NotFound) => "Record not found".to_string(),
            Error::Database(DbError::ForeignKeyViolation { .. }) => {
                "Referenced record does not exist".to_string()
            }
            Error::Database(DbError::CheckViolation { .. }) => {
                "Value rejected by a data integrity rule".to_string()
            }
            Error::Internal { .. } | Error::Database(DbError::Other(_)) | Error::Other(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Error::Internal { .. } | Error::Other(_) | Error::Database(DbError::Other(_)) => {
                tracing::error!("{self:?}");
            }
            Error::Delivery {
                email,
                transport,
                reason,
            } => {
                tracing::error!(%email, %transport, "email delivery failed: {reason:#}");
            }
            Error::Database(_) | Error::Forbidden { .. } => {
                tracing::warn!("{self}");
            }
            Error::Unauthenticated { .. } | Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::info!("{self}");
            }
            Error::Validation { .. } => {
                tracing::debug!("{self}");
            }
        }

        let body = match &self {
            Error::Validation { field, .. } => json!({
                "message": self.user_message(),
                "errors": { *field: [self.user_message()] },
            }),
            Error::Database(DbError::UniqueViolation {
                table, constraint, ..
            }) => json!({
                "message": self.user_message(),
                "conflict": { "table": table, "constraint": constraint },
            }),
            _ => json!({ "message": self.user_message() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Internal { operation: message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::Unauthenticated { message: None }.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::Validation {
                field: "password",
                message: "too short".to_string()
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::Database(DbError::UniqueViolation {
                constraint: "accounts_email_key".to_string(),
                table: "accounts".to_string(),
                message: "duplicate key".to_string(),
            })
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_unique_violation_messages_are_friendly() {
        let err = Error::Database(DbError::UniqueViolation {
            constraint: "accounts_email_key".to_string(),
            table: "accounts".to_string(),
            message: "duplicate key value violates unique constraint".to_string(),
        });
        assert_eq!(
            err.user_message(),
            "An account with this email address already exists"
        );

        let err = Error::Database(DbError::UniqueViolation {
            constraint: "allocations_open_tool_key".to_string(),
            table: "allocations".to_string(),
            message: "duplicate key value violates unique constraint".to_string(),
        });
        assert_eq!(err.user_message(), "This tool is already checked out");
    }

    #[test]
    fn test_internal_errors_stay_generic() {
        let err = Error::Internal {
            operation: "connecting to the database at 10.0.0.5".to_string(),
        };
        assert!(!err.user_message().contains("10.0.0.5"));
    }
}
