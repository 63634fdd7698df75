pub mod password;
pub mod reset_token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::otp::Channel;

// Re-export necessary items
pub use password::CredentialHasher;
pub use reset_token::{ResetClaims, ResetTokenIssuer, RESET_PURPOSE};

lazy_static! {
    // Registered phone numbers are 10 digits, no separators.
    static ref PHONE_REGEX: regex::Regex = regex::Regex::new(r"^\d{10}$").unwrap();
}

/// Payload for requesting an OTP challenge.
#[derive(Debug, Deserialize, Validate)]
pub struct SendOtpRequest {
    /// Delivery channel for the code.
    pub method: Channel,
    /// Phone number to look the account up by. Required when `method` is sms.
    #[validate(regex(path = "PHONE_REGEX", message = "Phone number must be 10 digits"))]
    pub phone: Option<String>,
    /// Email address to look the account up by. Required when `method` is email.
    #[validate(email)]
    pub email: Option<String>,
}

/// Payload for submitting an OTP code.
///
/// The channel is inferred from which lookup key is present; phone takes
/// precedence when both are supplied.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(regex(path = "PHONE_REGEX", message = "Phone number must be 10 digits"))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    /// The submitted 6-digit code.
    #[validate(length(min = 6, max = 6))]
    pub otp: String,
}

/// Response after a successful OTP verification.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyOtpResponse {
    /// Short-lived credential authorizing the password change.
    #[serde(rename = "resetToken")]
    pub reset_token: String,
    /// Human-readable credential lifetime.
    #[serde(rename = "expiresIn")]
    pub expires_in: String,
}

/// Payload for changing the password with a reset credential.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    /// The replacement password. Must be at least 6 characters long.
    #[serde(rename = "newPassword")]
    #[validate(length(min = 6))]
    pub new_password: String,
}
