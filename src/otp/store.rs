//!
//! # OTP Store
//!
//! Durable record of outstanding challenges, behind the [`ChallengeStore`]
//! trait so the lifecycle manager can be exercised against an in-memory
//! implementation in tests. The production implementation is
//! [`PgChallengeStore`] over a `sqlx` PostgreSQL pool.
//!
//! Expiry is enforced lazily: `find_active` filters out timed-out rows, so
//! `purge_expired` is pure housekeeping and may run on any schedule
//! including never.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Challenge, Channel, OtpError, MAX_ATTEMPTS};

/// Result of recording a failed verification try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The challenge survives; this many tries remain.
    Remaining(i32),
    /// The ceiling was breached and the challenge has been destroyed.
    CeilingBreached,
}

/// Storage operations for OTP challenges.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Removes every unconsumed challenge for the pair. Idempotent; succeeds
    /// when none exist.
    async fn invalidate_active(
        &self,
        account_ref: Uuid,
        channel: Channel,
    ) -> Result<(), OtpError>;

    /// Inserts a fresh challenge with zero attempts and
    /// `expires_at = now + ttl_secs`.
    async fn create(
        &self,
        account_ref: Uuid,
        channel: Channel,
        code_hash: &str,
        ttl_secs: i64,
    ) -> Result<Challenge, OtpError>;

    /// Returns the most recently created unconsumed, unexpired challenge for
    /// the pair, or `None`.
    async fn find_active(
        &self,
        account_ref: Uuid,
        channel: Channel,
    ) -> Result<Option<Challenge>, OtpError>;

    /// Atomically increments the attempt counter. When the new count reaches
    /// the ceiling the challenge is deleted and the breach reported.
    async fn record_failed_attempt(
        &self,
        challenge: &Challenge,
    ) -> Result<AttemptOutcome, OtpError>;

    /// Marks the challenge consumed. Idempotent no-op if already consumed.
    async fn consume(&self, challenge: &Challenge) -> Result<(), OtpError>;

    /// Physically removes the challenge row.
    async fn delete(&self, challenge: &Challenge) -> Result<(), OtpError>;

    /// Removes every challenge for the account, consumed or not. Used after
    /// a completed password change.
    async fn invalidate_account(&self, account_ref: Uuid) -> Result<(), OtpError>;

    /// Best-effort cleanup of timed-out challenges. Returns rows removed.
    async fn purge_expired(&self) -> Result<u64, OtpError>;
}

const CHALLENGE_COLUMNS: &str =
    "id, account_ref, code_hash, channel, attempts, consumed, created_at, expires_at";

/// PostgreSQL-backed challenge store.
pub struct PgChallengeStore {
    pool: PgPool,
}

impl PgChallengeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(error: sqlx::Error) -> OtpError {
    OtpError::StoreUnavailable(error.to_string())
}

#[async_trait]
impl ChallengeStore for PgChallengeStore {
    async fn invalidate_active(
        &self,
        account_ref: Uuid,
        channel: Channel,
    ) -> Result<(), OtpError> {
        sqlx::query(
            "DELETE FROM otp_challenges WHERE account_ref = $1 AND channel = $2 AND consumed = FALSE",
        )
        .bind(account_ref)
        .bind(channel)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn create(
        &self,
        account_ref: Uuid,
        channel: Channel,
        code_hash: &str,
        ttl_secs: i64,
    ) -> Result<Challenge, OtpError> {
        let now = Utc::now();
        let challenge = Challenge {
            id: Uuid::new_v4(),
            account_ref,
            code_hash: code_hash.to_string(),
            channel,
            attempts: 0,
            consumed: false,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_secs),
        };

        sqlx::query(
            "INSERT INTO otp_challenges \
             (id, account_ref, code_hash, channel, attempts, consumed, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(challenge.id)
        .bind(challenge.account_ref)
        .bind(&challenge.code_hash)
        .bind(challenge.channel)
        .bind(challenge.attempts)
        .bind(challenge.consumed)
        .bind(challenge.created_at)
        .bind(challenge.expires_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(challenge)
    }

    async fn find_active(
        &self,
        account_ref: Uuid,
        channel: Channel,
    ) -> Result<Option<Challenge>, OtpError> {
        let sql = format!(
            "SELECT {} FROM otp_challenges \
             WHERE account_ref = $1 AND channel = $2 AND consumed = FALSE AND expires_at > now() \
             ORDER BY created_at DESC LIMIT 1",
            CHALLENGE_COLUMNS
        );

        sqlx::query_as::<_, Challenge>(&sql)
            .bind(account_ref)
            .bind(channel)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn record_failed_attempt(
        &self,
        challenge: &Challenge,
    ) -> Result<AttemptOutcome, OtpError> {
        // Increment-and-fetch in one statement so two racing wrong guesses
        // cannot undercount.
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE otp_challenges SET attempts = attempts + 1 WHERE id = $1 RETURNING attempts",
        )
        .bind(challenge.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        let attempts = match row {
            Some((attempts,)) => attempts,
            // The row vanished under us (concurrent ceiling breach or purge).
            None => return Ok(AttemptOutcome::CeilingBreached),
        };

        if attempts >= MAX_ATTEMPTS {
            self.delete(challenge).await?;
            Ok(AttemptOutcome::CeilingBreached)
        } else {
            Ok(AttemptOutcome::Remaining(MAX_ATTEMPTS - attempts))
        }
    }

    async fn consume(&self, challenge: &Challenge) -> Result<(), OtpError> {
        sqlx::query("UPDATE otp_challenges SET consumed = TRUE WHERE id = $1")
            .bind(challenge.id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete(&self, challenge: &Challenge) -> Result<(), OtpError> {
        sqlx::query("DELETE FROM otp_challenges WHERE id = $1")
            .bind(challenge.id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn invalidate_account(&self, account_ref: Uuid) -> Result<(), OtpError> {
        sqlx::query("DELETE FROM otp_challenges WHERE account_ref = $1")
            .bind(account_ref)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, OtpError> {
        let result = sqlx::query("DELETE FROM otp_challenges WHERE expires_at < now()")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected())
    }
}
