//! Database-specific error types.
//!
//! [`DbError`] classifies the failures repositories care about so handlers can
//! map them to the right HTTP status without string-matching on driver errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violation: {message}")]
    UniqueViolation {
        constraint: String,
        table: String,
        message: String,
    },

    #[error("foreign key violation: {message}")]
    ForeignKeyViolation { constraint: String, message: String },

    #[error("check constraint violation: {message}")]
    CheckViolation { constraint: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                let message = db_err.message().to_string();
                if db_err.is_unique_violation() {
                    DbError::UniqueViolation {
                        constraint,
                        table: db_err.table().unwrap_or("unknown").to_string(),
                        message,
                    }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation { constraint, message }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation { constraint, message }
                } else {
                    DbError::Other(sqlx::Error::Database(db_err).into())
                }
            }
            other => DbError::Other(other.into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
