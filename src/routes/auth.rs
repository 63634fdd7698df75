use crate::{
    auth::{ChangePasswordRequest, SendOtpRequest, VerifyOtpRequest, VerifyOtpResponse},
    error::AppError,
    otp::{manager::OtpManager, Channel},
};
use actix_web::{http::header, post, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use validator::Validate;

/// Request an OTP challenge
///
/// Resolves the account from the lookup key matching the chosen delivery
/// method, supersedes any previously active challenge, and dispatches a
/// fresh code. The response never contains the code, and it reports success
/// even when delivery failed: the stored challenge stays valid either way.
///
/// ## Responses:
/// - `200 OK`: A challenge was created.
/// - `400 Bad Request`: Lookup key missing for the chosen method.
/// - `404 Not Found`: No account registered under the lookup key.
/// - `422 Unprocessable Entity`: Malformed phone number or email address.
#[post("/otp/send")]
pub async fn send_otp(
    manager: web::Data<OtpManager>,
    data: web::Json<SendOtpRequest>,
) -> Result<impl Responder, AppError> {
    data.validate()?;

    let lookup = match data.method {
        Channel::Sms => data.phone.as_deref().ok_or_else(|| {
            AppError::BadRequest("Phone number is required for sms delivery".into())
        })?,
        Channel::Email => data.email.as_deref().ok_or_else(|| {
            AppError::BadRequest("Email address is required for email delivery".into())
        })?,
    };

    manager.request_challenge(data.method, lookup).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "OTP sent successfully"
    })))
}

/// Verify an OTP code
///
/// The channel is inferred from the supplied lookup key (phone implies sms
/// and wins when both keys are present). On success the challenge is
/// consumed and a short-lived reset token is returned.
///
/// ## Responses:
/// - `200 OK`: Returns `resetToken` and `expiresIn`.
/// - `400 Bad Request`: No active challenge, expired challenge, or wrong
///   code (with `remainingAttempts`).
/// - `404 Not Found`: No account registered under the lookup key.
/// - `429 Too Many Requests`: Attempt ceiling breached; the challenge is
///   destroyed and a new one must be requested.
#[post("/otp/verify")]
pub async fn verify_otp(
    manager: web::Data<OtpManager>,
    data: web::Json<VerifyOtpRequest>,
) -> Result<impl Responder, AppError> {
    data.validate()?;

    if data.phone.is_none() && data.email.is_none() {
        return Err(AppError::BadRequest(
            "Phone or email and OTP are required".into(),
        ));
    }

    let verified = manager
        .verify_challenge(data.phone.as_deref(), data.email.as_deref(), &data.otp)
        .await?;

    Ok(HttpResponse::Ok().json(VerifyOtpResponse {
        reset_token: verified.reset_token,
        expires_in: verified.expires_in,
    }))
}

/// Change the password with a reset token
///
/// Expects the reset token from `/otp/verify` as a Bearer credential. The
/// token is validated (signature, expiry, purpose) before the user store is
/// touched.
///
/// ## Responses:
/// - `200 OK`: Password replaced.
/// - `400 Bad Request`: Invalid or expired reset token.
/// - `401 Unauthorized`: Missing Bearer credential.
/// - `404 Not Found`: The account no longer exists.
#[post("/password/reset")]
pub async fn reset_password(
    manager: web::Data<OtpManager>,
    req: HttpRequest,
    data: web::Json<ChangePasswordRequest>,
) -> Result<impl Responder, AppError> {
    data.validate()?;

    let token = bearer_token(&req)?;
    manager.change_password(token, &data.new_password).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Password has been reset"
    })))
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("No reset token provided".into()))
}
