//! API error taxonomy.
//!
//! Every handler returns [`ApiError`] on failure; the `IntoResponse` impl
//! maps each variant onto an HTTP status and a `{message, errors?}` JSON
//! body. Storage faults are logged with full detail and surfaced to the
//! caller as a generic 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type ApiResult<T> = Result<T, ApiError>;

/// A single field-level validation failure.
#[derive(Clone, Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// One cart/order line whose requested quantity exceeds available stock.
#[derive(Clone, Debug, Serialize)]
pub struct StockShortage {
    pub product_id: Uuid,
    pub title: String,
    pub requested: i32,
    pub available: i32,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Validation failed.")]
    FieldErrors(Vec<FieldError>),

    #[error("Not authenticated.")]
    Unauthorized,

    #[error("Not authorized.")]
    Forbidden,

    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("The following items are out of stock: {}", format_shortages(.0))]
    OutOfStock(Vec<StockShortage>),

    #[error("Payment session could not be created.")]
    Gateway(#[source] anyhow::Error),

    #[error("Internal server error.")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error.")]
    Internal(#[from] anyhow::Error),
}

fn format_shortages(items: &[StockShortage]) -> String {
    items
        .iter()
        .map(|s| {
            format!(
                "{} (requested: {}, available: {})",
                s.title, s.requested, s.available
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<serde_json::Value>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::FieldErrors(_) | Self::OutOfStock(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn errors(&self) -> Option<serde_json::Value> {
        match self {
            Self::FieldErrors(fields) => serde_json::to_value(fields).ok(),
            Self::OutOfStock(items) => serde_json::to_value(items).ok(),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Database(err) => tracing::error!(error = %err, "database error"),
            ApiError::Internal(err) => tracing::error!(error = ?err, "unexpected error"),
            ApiError::Gateway(err) => tracing::error!(error = ?err, "payment gateway error"),
            _ => {}
        }
        let body = ErrorBody {
            message: self.to_string(),
            errors: self.errors(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errs: validator::ValidationErrors) -> Self {
        let fields = errs
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid value for {field}")),
                })
            })
            .collect();
        Self::FieldErrors(fields)
    }
}

/// True when the error is a Postgres unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation))
}

/// True when the error is a foreign-key violation, i.e. a referenced row
/// disappeared between validation and the write. Callers map this back to
/// the not-found error the vanished reference would have produced.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::ForeignKeyViolation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_stock_message_names_each_item() {
        let err = ApiError::OutOfStock(vec![
            StockShortage {
                product_id: Uuid::nil(),
                title: "Linen Shirt".into(),
                requested: 3,
                available: 1,
            },
            StockShortage {
                product_id: Uuid::nil(),
                title: "Denim Jacket".into(),
                requested: 2,
                available: 0,
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("Linen Shirt (requested: 3, available: 1)"));
        assert!(msg.contains("Denim Jacket (requested: 2, available: 0)"));
    }

    #[derive(Debug)]
    struct FakePgError(&'static str);

    impl std::fmt::Display for FakePgError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "SQLSTATE {}", self.0)
        }
    }

    impl std::error::Error for FakePgError {}

    impl sqlx::error::DatabaseError for FakePgError {
        fn message(&self) -> &str {
            "constraint violation"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.0.into())
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            match self.0 {
                "23505" => sqlx::error::ErrorKind::UniqueViolation,
                "23503" => sqlx::error::ErrorKind::ForeignKeyViolation,
                _ => sqlx::error::ErrorKind::Other,
            }
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn db_err(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakePgError(code)))
    }

    #[test]
    fn unique_violation_is_detected() {
        assert!(is_unique_violation(&db_err("23505")));
        assert!(!is_unique_violation(&db_err("23503")));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn foreign_key_violation_is_detected() {
        assert!(is_foreign_key_violation(&db_err("23503")));
        assert!(!is_foreign_key_violation(&db_err("23505")));
        assert!(!is_foreign_key_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("order").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Conflict("dup".into()).status(),
            StatusCode::CONFLICT
        );
    }
}
