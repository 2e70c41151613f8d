use std::collections::BTreeMap;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use diesel::result::DatabaseErrorKind;
use serde_json::json;
use thiserror::Error;

use crate::database::{duplicate_like, duplicate_username};

/// Field name -> list of messages, the body of every validation failure.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";
pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NULL: &str = "This field may not be null.";

/** Holds the errors we will use during request processing */
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),
    #[error("Invalid Credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("Token is invalid or expired")]
    TokenNotValid,
    #[error("Not found.")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Validation error carrying a single message for a single field.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) | AppError::TokenNotValid => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(errors) => json!(errors),
            AppError::InvalidCredentials => json!({ "error": "Invalid Credentials" }),
            AppError::Unauthorized(detail) => json!({ "detail": detail }),
            AppError::TokenNotValid => json!({
                "detail": "Token is invalid or expired",
                "code": "token_not_valid"
            }),
            AppError::NotFound => json!({ "detail": "Not found." }),
            AppError::Internal(message) => {
                log::error!("request failed: {}", message);
                json!({ "detail": "A server error occurred." })
            }
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => AppError::NotFound,
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                match info.constraint_name() {
                    Some(name) if name.contains("username") => duplicate_username(),
                    _ => duplicate_like(),
                }
            }
            diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                AppError::field(NON_FIELD_ERRORS, "Referenced object does not exist.")
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2_redis::redis::RedisError> for AppError {
    fn from(err: r2d2_redis::redis::RedisError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            serde_json::error::Category::Io => AppError::Internal(err.to_string()),
            _ => AppError::field(NON_FIELD_ERRORS, format!("JSON parse error - {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body;
    use pretty_assertions::assert_eq;

    async fn body_of(err: AppError) -> serde_json::Value {
        let resp = err.error_response();
        let bytes = body::to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_rt::test]
    async fn test_status_codes() {
        assert_eq!(AppError::field("title", REQUIRED).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::TokenNotValid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_rt::test]
    async fn test_bodies() {
        assert_eq!(
            body_of(AppError::field("title", REQUIRED)).await,
            json!({ "title": [REQUIRED] })
        );
        assert_eq!(
            body_of(AppError::InvalidCredentials).await,
            json!({ "error": "Invalid Credentials" })
        );
        assert_eq!(body_of(AppError::NotFound).await, json!({ "detail": "Not found." }));
        assert_eq!(
            body_of(AppError::Internal("secret connection string".into())).await,
            json!({ "detail": "A server error occurred." })
        );
    }

    #[test]
    fn test_malformed_json_is_validation() {
        let err = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
        match AppError::from(err) {
            AppError::Validation(errors) => assert!(errors.contains_key(NON_FIELD_ERRORS)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_diesel_not_found() {
        assert!(matches!(
            AppError::from(diesel::result::Error::NotFound),
            AppError::NotFound
        ));
    }
}
