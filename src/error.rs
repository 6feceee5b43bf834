use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::notifier::NotifierError;
use crate::store::StoreError;

/// Why a protected request was turned away by the access guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    MissingAuthorization,
    InvalidToken,
    LacksPermission,
}

impl ForbiddenReason {
    pub fn code(self) -> &'static str {
        match self {
            ForbiddenReason::MissingAuthorization => "AUTHORIZATION_HEADER_NOT_FOUND",
            ForbiddenReason::InvalidToken => "INVALID_TOKEN",
            ForbiddenReason::LacksPermission => "LACKS_PERMISSION",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists")]
    Conflict,

    #[error("Invalid email or password")]
    Unauthorized,

    #[error("Access denied: {}", .0.code())]
    Forbidden(ForbiddenReason),

    #[error("User not found")]
    UserNotFound,

    #[error("Shopping list with ID \"{0}\" not found for this user")]
    ListNotFound(String),

    #[error("Invalid or expired reset code")]
    InvalidResetCode,

    #[error("Shopping list items are corrupted or malformed")]
    MalformedItems,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Notifier error: {0}")]
    Notifier(#[from] NotifierError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Conflict => "USER_ALREADY_EXISTS",
            AppError::Unauthorized => "INVALID_CREDENTIALS",
            AppError::Forbidden(reason) => reason.code(),
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::ListNotFound(_) => "LIST_NOT_FOUND",
            AppError::InvalidResetCode => "INVALID_OR_EXPIRED",
            AppError::MalformedItems => "MALFORMED_ITEMS",
            AppError::Store(_) | AppError::Notifier(_) => "DOWNSTREAM_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn is_server_side(&self) -> bool {
        matches!(
            self,
            AppError::Store(_) | AppError::Notifier(_) | AppError::Internal(_)
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("token signing failed: {}", err))
    }
}

impl From<argon2::Error> for AppError {
    fn from(err: argon2::Error) -> Self {
        AppError::Internal(format!("password hashing failed: {}", err))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    status_code: u16,
    error: &'a str,
    message: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidResetCode | AppError::MalformedItems => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::ListNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Notifier(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Downstream details stay in the logs
        let message = if self.is_server_side() {
            log::error!("{}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(ErrorBody {
            status_code: status.as_u16(),
            error: self.code(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn forbidden_reasons_map_to_stable_codes() {
        assert_eq!(
            AppError::Forbidden(ForbiddenReason::MissingAuthorization).code(),
            "AUTHORIZATION_HEADER_NOT_FOUND"
        );
        assert_eq!(
            AppError::Forbidden(ForbiddenReason::InvalidToken).code(),
            "INVALID_TOKEN"
        );
        assert_eq!(
            AppError::Forbidden(ForbiddenReason::LacksPermission).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::UserNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::ListNotFound("l1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::InvalidResetCode.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MalformedItems.code(), "MALFORMED_ITEMS");
    }

    #[actix_web::test]
    async fn internal_details_are_not_exposed() {
        let resp = AppError::Internal("secret detail".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "INTERNAL_ERROR");
        assert_eq!(json["statusCode"], 500);
        assert!(!json["message"].as_str().unwrap().contains("secret detail"));
    }
}
