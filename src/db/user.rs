use super::DBClient;
use crate::models::{EmailVerificationCode, User};
use chrono::{DateTime, Utc};

const USER_COLUMNS: &str = "id, email, password, name, is_active, email_verified_at, referral_code, \
     invited_by, points, registration_src, bio, city, job_title, photo_url, created_at, updated_at";

/// User and verification-code database operations
pub trait UserExt {
    /// Get single user by ID or email
    async fn get_user(
        &self,
        user_id: Option<i64>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn referral_code_exists(&self, referral_code: &str) -> Result<bool, sqlx::Error>;

    /// Create an inactive, unverified user
    async fn save_user(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
        referral_code: &str,
    ) -> Result<User, sqlx::Error>;

    async fn save_verification_code(
        &self,
        user_id: i64,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>;

    /// Newest unused code matching (email, code). Expiry is left to the caller.
    async fn find_verification_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<EmailVerificationCode>, sqlx::Error>;

    /// Consumes the code and activates the user in one transaction. `None`
    /// when the code was already used or has expired.
    async fn complete_verification(
        &self,
        user_id: i64,
        code_id: i64,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Deletes codes that are expired or already used
    async fn delete_stale_verification_codes(&self) -> Result<u64, sqlx::Error>;
}

impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<i64>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        }

        Ok(user)
    }

    async fn referral_code_exists(&self, referral_code: &str) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE referral_code = ?)")
                .bind(referral_code)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn save_user(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
        referral_code: &str,
    ) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        let user = sqlx::query_as(&format!(
            "INSERT INTO users (email, password, name, is_active, referral_code, points, created_at, updated_at) \
             VALUES (?, ?, ?, 0, ?, 0, ?, ?) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password)
        .bind(name)
        .bind(referral_code)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn save_verification_code(
        &self,
        user_id: i64,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO email_verification_codes (user_id, code, email, expires_at, used, created_at) \
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(user_id)
        .bind(code)
        .bind(email)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_verification_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<EmailVerificationCode>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, user_id, code, email, expires_at, used, created_at \
             FROM email_verification_codes \
             WHERE email = ? AND code = ? AND used = 0 \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1",
        )
        .bind(email)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn complete_verification(
        &self,
        user_id: i64,
        code_id: i64,
    ) -> Result<Option<User>, sqlx::Error> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query(
            "UPDATE email_verification_codes SET used = 1 \
             WHERE id = ? AND used = 0 AND expires_at > ?",
        )
        .bind(code_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if consumed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let user = sqlx::query_as(&format!(
            "UPDATE users SET is_active = 1, email_verified_at = ?, updated_at = ? \
             WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(now)
        .bind(now)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(user))
    }

    async fn delete_stale_verification_codes(&self) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM email_verification_codes WHERE used = 1 OR expires_at < ?")
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
