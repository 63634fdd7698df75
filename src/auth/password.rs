use crate::otp::OtpError;
use bcrypt::{hash, verify};

/// One-way hash and verify for secrets: OTP codes and account passwords.
///
/// The bcrypt cost factor is injected at construction so a single hash call
/// can be tuned to cost tens of milliseconds in production while tests run
/// at the cheapest setting.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    cost: u32,
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Salted one-way transform of `secret`.
    pub fn hash(&self, secret: &str) -> Result<String, OtpError> {
        hash(secret, self.cost)
            .map_err(|e| OtpError::Internal(format!("Failed to hash secret: {}", e)))
    }

    /// True iff `secret` hashes to `digest` under the same scheme.
    ///
    /// A mismatch is a normal `Ok(false)`, never an error. A malformed digest
    /// also verifies as `false`: callers treat any unverifiable digest as a
    /// wrong secret rather than a fault.
    pub fn verify(&self, secret: &str, digest: &str) -> Result<bool, OtpError> {
        Ok(verify(secret, digest).unwrap_or(false))
    }
}
