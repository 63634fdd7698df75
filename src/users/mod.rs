//!
//! # User Directory
//!
//! Narrow interface onto the external user store. The OTP core only needs to
//! resolve an account from a phone number or email address and, at the end
//! of the reset flow, swap its password hash. Everything else about users
//! (registration, sign-in, profiles) belongs to other services.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::otp::OtpError;

/// An account as exposed to the OTP core.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    /// Opaque account identifier.
    pub id: Uuid,
    /// Name used when addressing the account in delivered messages.
    pub display_name: String,
    /// Registered email address.
    pub email: String,
    /// Registered phone number, if any.
    pub phone: Option<String>,
    /// Profile picture, if any.
    pub picture_url: Option<String>,
    /// Current password hash. Mutated only by the password-change flow.
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Lookup and password-update operations against the user store.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, OtpError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, OtpError>;

    /// Replaces the account's password hash. Fails with `AccountNotFound`
    /// when the account no longer exists.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), OtpError>;
}

const ACCOUNT_COLUMNS: &str = "id, display_name, email, phone, picture_url, password_hash";

/// PostgreSQL-backed user directory.
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(error: sqlx::Error) -> OtpError {
    OtpError::StoreUnavailable(error.to_string())
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, OtpError> {
        let sql = format!("SELECT {} FROM users WHERE phone = $1", ACCOUNT_COLUMNS);
        sqlx::query_as::<_, Account>(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, OtpError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", ACCOUNT_COLUMNS);
        sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), OtpError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(OtpError::AccountNotFound);
        }
        Ok(())
    }
}
