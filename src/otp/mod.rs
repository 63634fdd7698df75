//!
//! # OTP Core
//!
//! Domain types for the one-time-passcode subsystem: the delivery `Channel`,
//! the persisted `Challenge` record, the `OtpError` taxonomy shared by every
//! component, and the fixed lifecycle constants (TTL and attempt ceiling).
//!
//! The state machine that drives these types lives in [`manager`]; storage
//! and delivery are behind the trait seams in [`store`] and [`dispatch`].

pub mod dispatch;
pub mod manager;
pub mod store;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// How long a challenge stays verifiable after issuance (5 minutes).
pub const OTP_TTL_SECS: i64 = 5 * 60;

/// Wrong-code ceiling. The challenge is destroyed on the breaching attempt.
pub const MAX_ATTEMPTS: i32 = 5;

/// Lifetime of the reset credential minted after a successful verification.
pub const RESET_TOKEN_TTL_SECS: i64 = 5 * 60;

/// The reset-credential lifetime as advertised to callers ("5m").
pub fn reset_token_lifetime() -> String {
    format!("{}m", RESET_TOKEN_TTL_SECS / 60)
}

/// Delivery path for an OTP. Also the lookup discriminator: an account can
/// hold one active challenge per channel.
/// Corresponds to the `otp_channel` SQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "otp_channel", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Code delivered by text message to the account's phone number.
    Sms,
    /// Code delivered to the account's email address.
    Email,
}

/// One outstanding OTP issuance record, as stored in the database.
///
/// The plaintext code is never persisted; only its bcrypt digest.
#[derive(Debug, Clone, FromRow)]
pub struct Challenge {
    /// Unique identifier for the challenge row.
    pub id: Uuid,
    /// Account this challenge belongs to.
    pub account_ref: Uuid,
    /// One-way hash of the plaintext code.
    pub code_hash: String,
    /// Which delivery path was used.
    pub channel: Channel,
    /// Count of failed verification tries so far.
    pub attempts: i32,
    /// Once true the challenge is permanently inert.
    pub consumed: bool,
    /// When the challenge was created.
    pub created_at: DateTime<Utc>,
    /// `created_at` plus the fixed TTL. Past this instant the challenge is
    /// treated as nonexistent even if not yet physically removed.
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    /// True once the challenge has passed its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Generates a uniformly random 6-digit decimal code.
///
/// The range starts at 100000 so the code never loses a leading zero when
/// rendered as a number.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Everything that can go wrong inside the OTP core.
///
/// These are returned as typed results to the HTTP layer; the core never
/// constructs HTTP responses itself. `NoActiveChallenge` deliberately covers
/// both "never requested" and "expired", so a caller cannot probe whether a
/// challenge exists.
#[derive(Debug)]
pub enum OtpError {
    /// No account matches the supplied phone number or email address.
    AccountNotFound,
    /// No active challenge for this account and channel (absent, consumed,
    /// or expired).
    NoActiveChallenge,
    /// The challenge expired between lookup and verification.
    ChallengeExpired,
    /// The submitted code did not match. Carries the tries left before the
    /// challenge is destroyed.
    InvalidCode { remaining_attempts: i32 },
    /// The attempt ceiling was breached; the challenge has been destroyed
    /// and a new one must be requested.
    TooManyAttempts,
    /// The backing store could not be read or written.
    StoreUnavailable(String),
    /// The transport could not deliver the code.
    DeliveryFailed(String),
    /// The reset credential failed validation (bad signature, wrong purpose,
    /// or expired).
    TokenInvalid(String),
    /// Unexpected internal fault (hashing, token encoding).
    Internal(String),
}

impl fmt::Display for OtpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OtpError::AccountNotFound => write!(f, "Account not found"),
            OtpError::NoActiveChallenge => write!(f, "OTP not found or already used"),
            OtpError::ChallengeExpired => write!(f, "OTP has expired"),
            OtpError::InvalidCode { remaining_attempts } => {
                write!(f, "Invalid OTP ({} attempts remaining)", remaining_attempts)
            }
            OtpError::TooManyAttempts => write!(f, "Too many failed attempts"),
            OtpError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            OtpError::DeliveryFailed(msg) => write!(f, "Delivery failed: {}", msg),
            OtpError::TokenInvalid(msg) => write!(f, "Invalid reset token: {}", msg),
            OtpError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}
