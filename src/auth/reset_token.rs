use crate::otp::OtpError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Purpose tag carried by every reset credential. A token with any other
/// purpose is rejected outright.
pub const RESET_PURPOSE: &str = "reset";

/// Claims embedded in a reset credential.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetClaims {
    /// Account the credential authorizes a password change for.
    pub sub: Uuid,
    /// Fixed purpose tag; must equal [`RESET_PURPOSE`].
    pub purpose: String,
    /// Issue timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

/// Mints and validates short-lived, purpose-scoped reset credentials.
///
/// Tokens are stateless HS256 JWTs: no server-side record is kept, so a
/// token remains technically replayable until it expires. The signing secret
/// is injected at construction rather than read from the environment.
#[derive(Clone)]
pub struct ResetTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl ResetTokenIssuer {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        let mut validation = Validation::default();
        // The reset window is exactly the TTL; no expiry leeway.
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    /// Produces a signed credential for `account_ref`, expiring after the
    /// configured TTL.
    pub fn issue(&self, account_ref: Uuid) -> Result<String, OtpError> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.ttl_secs);
        let claims = ResetClaims {
            sub: account_ref,
            purpose: RESET_PURPOSE.to_string(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| OtpError::Internal(format!("Failed to issue reset token: {}", e)))
    }

    /// Validates signature, expiry, and purpose; returns the embedded
    /// account reference.
    pub fn validate(&self, token: &str) -> Result<Uuid, OtpError> {
        let data = decode::<ResetClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| OtpError::TokenInvalid(e.to_string()))?;

        if data.claims.purpose != RESET_PURPOSE {
            return Err(OtpError::TokenInvalid("wrong token purpose".to_string()));
        }
        Ok(data.claims.sub)
    }
}
