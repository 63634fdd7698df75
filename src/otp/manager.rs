//!
//! # OTP Lifecycle Manager
//!
//! The core state machine. Per (account, channel) a challenge moves
//! NONE → ACTIVE → {CONSUMED | EXPIRED | LOCKED}; LOCKED and EXPIRED are
//! terminal for that instance, and a new request always supersedes whatever
//! was active before it.
//!
//! The manager owns no I/O of its own: storage, account lookup, and
//! delivery all sit behind the injected collaborators.

use log::warn;
use std::sync::Arc;
use uuid::Uuid;

use super::dispatch::Dispatcher;
use super::store::{AttemptOutcome, ChallengeStore};
use super::{generate_code, reset_token_lifetime, Channel, OtpError, OTP_TTL_SECS};
use crate::auth::{CredentialHasher, ResetTokenIssuer};
use crate::users::{Account, UserDirectory};
use chrono::Utc;

/// Outcome of a successful verification: the minted reset credential and its
/// advertised lifetime.
#[derive(Debug)]
pub struct VerifiedChallenge {
    pub reset_token: String,
    pub expires_in: String,
}

/// Orchestrates generation, supersession, attempt accounting, expiry
/// enforcement, and consumption of OTP challenges.
pub struct OtpManager {
    store: Arc<dyn ChallengeStore>,
    directory: Arc<dyn UserDirectory>,
    dispatcher: Dispatcher,
    hasher: CredentialHasher,
    issuer: ResetTokenIssuer,
}

impl OtpManager {
    pub fn new(
        store: Arc<dyn ChallengeStore>,
        directory: Arc<dyn UserDirectory>,
        dispatcher: Dispatcher,
        hasher: CredentialHasher,
        issuer: ResetTokenIssuer,
    ) -> Self {
        Self {
            store,
            directory,
            dispatcher,
            hasher,
            issuer,
        }
    }

    /// Issues a fresh challenge for the account registered under `lookup`
    /// (a phone number for sms, an email address otherwise) and dispatches
    /// the code.
    ///
    /// Any previously active challenge for the pair is invalidated first, so
    /// at most one challenge is ever verifiable. The challenge is stored
    /// before the send: a transport failure leaves a valid, undelivered
    /// challenge rather than silently discarding a real one, and is not
    /// reported to the caller.
    pub async fn request_challenge(
        &self,
        channel: Channel,
        lookup: &str,
    ) -> Result<(), OtpError> {
        let account = match channel {
            Channel::Sms => self.directory.find_by_phone(lookup).await?,
            Channel::Email => self.directory.find_by_email(lookup).await?,
        }
        .ok_or(OtpError::AccountNotFound)?;

        self.store.invalidate_active(account.id, channel).await?;

        let code = generate_code();
        let code_hash = self.hasher.hash(&code)?;
        self.store
            .create(account.id, channel, &code_hash, OTP_TTL_SECS)
            .await?;

        if let Err(err) = self.dispatcher.send(channel, &account, &code).await {
            warn!(
                "OTP delivery failed for account {} over {:?}: {}",
                account.id, channel, err
            );
        }

        Ok(())
    }

    /// Validates a submitted code and, on success, consumes the challenge
    /// and mints a reset credential.
    ///
    /// The channel is inferred from the lookup key; phone takes precedence
    /// when both are supplied.
    pub async fn verify_challenge(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
        code: &str,
    ) -> Result<VerifiedChallenge, OtpError> {
        let (account, channel) = self.resolve(phone, email).await?;

        let challenge = self
            .store
            .find_active(account.id, channel)
            .await?
            .ok_or(OtpError::NoActiveChallenge)?;

        // The store filters expired rows, but a row can age past its expiry
        // between lookup and this check.
        if challenge.is_expired(Utc::now()) {
            self.store.delete(&challenge).await?;
            return Err(OtpError::ChallengeExpired);
        }

        if !self.hasher.verify(code, &challenge.code_hash)? {
            return match self.store.record_failed_attempt(&challenge).await? {
                AttemptOutcome::CeilingBreached => Err(OtpError::TooManyAttempts),
                AttemptOutcome::Remaining(remaining_attempts) => Err(OtpError::InvalidCode {
                    remaining_attempts,
                }),
            };
        }

        self.store.consume(&challenge).await?;

        let reset_token = self.issuer.issue(account.id)?;
        Ok(VerifiedChallenge {
            reset_token,
            expires_in: reset_token_lifetime(),
        })
    }

    /// Validates a reset credential and replaces the account's password.
    ///
    /// All outstanding challenges for the account are wiped afterwards;
    /// that cleanup is fire-and-forget.
    pub async fn change_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<(), OtpError> {
        let account_ref = self.issuer.validate(reset_token)?;

        let password_hash = self.hasher.hash(new_password)?;
        self.directory
            .update_password(account_ref, &password_hash)
            .await?;

        if let Err(err) = self.store.invalidate_account(account_ref).await {
            warn!(
                "failed to clear challenges for account {} after password change: {}",
                account_ref, err
            );
        }

        Ok(())
    }

    async fn resolve(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<(Account, Channel), OtpError> {
        if let Some(phone) = phone {
            let account = self
                .directory
                .find_by_phone(phone)
                .await?
                .ok_or(OtpError::AccountNotFound)?;
            return Ok((account, Channel::Sms));
        }
        if let Some(email) = email {
            let account = self
                .directory
                .find_by_email(email)
                .await?
                .ok_or(OtpError::AccountNotFound)?;
            return Ok((account, Channel::Email));
        }
        Err(OtpError::AccountNotFound)
    }
}
