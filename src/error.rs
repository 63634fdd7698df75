//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used by the HTTP
//! layer. The OTP core returns its own typed [`OtpError`] results and knows
//! nothing about status codes; the `From<OtpError>` impl here is the single
//! place where core outcomes are mapped onto HTTP semantics.
//!
//! `AppError` implements `actix_web::error::ResponseError` to convert
//! application errors into JSON responses. Deliberately, the responses never
//! distinguish "no challenge", "already consumed", and "expired long ago"
//! beyond what the core reports, so callers cannot probe challenge state.

use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::otp::OtpError;

/// Represents all possible errors surfaced by the HTTP layer.
#[derive(Debug)]
pub enum AppError {
    /// Missing or unusable credential (HTTP 401).
    Unauthorized(String),
    /// Malformed or unsatisfiable request (HTTP 400).
    BadRequest(String),
    /// Requested resource or account does not exist (HTTP 404).
    NotFound(String),
    /// Wrong OTP code; carries the tries left before lockout (HTTP 400).
    InvalidCode { remaining_attempts: i32 },
    /// Attempt ceiling breached; a new challenge must be requested (HTTP 429).
    TooManyAttempts,
    /// Failed input validation (HTTP 422 Unprocessable Entity).
    ValidationError(String),
    /// Unexpected server-side fault (HTTP 500).
    InternalServerError(String),
    /// Backing store unreachable; the only caller-retryable kind (HTTP 503).
    ServiceUnavailable(String),
    /// Upstream transport refused the delivery (HTTP 502).
    BadGateway(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InvalidCode { remaining_attempts } => {
                write!(f, "Invalid OTP ({} attempts remaining)", remaining_attempts)
            }
            AppError::TooManyAttempts => write!(f, "Too many failed attempts"),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            AppError::BadGateway(msg) => write!(f, "Bad Gateway: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(json!({
                "error": msg
            })),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(json!({
                "error": msg
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "error": msg
            })),
            AppError::InvalidCode { remaining_attempts } => {
                HttpResponse::BadRequest().json(json!({
                    "error": "Invalid OTP. Please try again.",
                    "remainingAttempts": remaining_attempts
                }))
            }
            AppError::TooManyAttempts => HttpResponse::TooManyRequests().json(json!({
                "error": "Too many failed attempts. Please request a new OTP."
            })),
            AppError::ValidationError(msg) => HttpResponse::UnprocessableEntity().json(json!({
                "error": msg
            })),
            // Internal details are not leaked to the client.
            AppError::InternalServerError(_) => HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            })),
            AppError::ServiceUnavailable(_) => HttpResponse::ServiceUnavailable().json(json!({
                "error": "Service temporarily unavailable"
            })),
            AppError::BadGateway(_) => HttpResponse::BadGateway().json(json!({
                "error": "Delivery failed"
            })),
        }
    }
}

/// Maps core OTP outcomes onto HTTP-layer errors.
impl From<OtpError> for AppError {
    fn from(error: OtpError) -> AppError {
        match error {
            OtpError::AccountNotFound => AppError::NotFound("Account not found".into()),
            OtpError::NoActiveChallenge => {
                AppError::BadRequest("OTP not found or already used".into())
            }
            OtpError::ChallengeExpired => {
                AppError::BadRequest("OTP has expired. Please request a new one.".into())
            }
            OtpError::InvalidCode { remaining_attempts } => {
                AppError::InvalidCode { remaining_attempts }
            }
            OtpError::TooManyAttempts => AppError::TooManyAttempts,
            OtpError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
            // No current handler surfaces this: the request path swallows
            // delivery failures (store-then-send). The mapping stays total
            // so any future caller that does propagate one gets a 502.
            OtpError::DeliveryFailed(msg) => AppError::BadGateway(msg),
            OtpError::TokenInvalid(_) => {
                AppError::BadRequest("Invalid or expired reset token".into())
            }
            OtpError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// The detailed validation messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_responses() {
        let error = AppError::Unauthorized("No reset token provided".into());
        assert_eq!(error.error_response().status(), 401);

        let error = AppError::BadRequest("Invalid input".into());
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::NotFound("Account not found".into());
        assert_eq!(error.error_response().status(), 404);

        let error = AppError::TooManyAttempts;
        assert_eq!(error.error_response().status(), 429);

        let error = AppError::InvalidCode {
            remaining_attempts: 4,
        };
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::ServiceUnavailable("pool timed out".into());
        assert_eq!(error.error_response().status(), 503);

        let error = AppError::BadGateway("gateway rejected message".into());
        assert_eq!(error.error_response().status(), 502);
    }

    #[test]
    fn test_otp_error_mapping() {
        assert!(matches!(
            AppError::from(OtpError::AccountNotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(OtpError::NoActiveChallenge),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(OtpError::InvalidCode {
                remaining_attempts: 3
            }),
            AppError::InvalidCode {
                remaining_attempts: 3
            }
        ));
        assert!(matches!(
            AppError::from(OtpError::TokenInvalid("ExpiredSignature".into())),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(OtpError::DeliveryFailed("gateway down".into())),
            AppError::BadGateway(_)
        ));
    }
}
