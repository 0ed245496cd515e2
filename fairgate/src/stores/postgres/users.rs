//! Minimal read interface to the external user system.
//!
//! Account management lives elsewhere; the booking core only needs an
//! email address to send payment requests and promotion notices.

use crate::providers::UserDirectory;
use fairgate_core::{CoreError, Result, UserId};
use sqlx::PgPool;

/// Postgres user directory.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Create a directory over the shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserDirectory for PgUserDirectory {
    async fn email_for(&self, user: UserId) -> Result<String> {
        let row: Option<(String,)> = sqlx::query_as("SELECT email FROM users WHERE id = $1")
            .bind(user.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::database)?;
        row.map(|(email,)| email)
            .ok_or(CoreError::NotFound("user"))
    }
}
