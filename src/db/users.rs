/// User repository for the identity service
///
/// The user store is the one external collaborator of the auth subsystem,
/// so it sits behind a trait; `PgUserRepository` is the production
/// implementation and tests substitute mocks or an in-memory table.
use crate::error::{AuthError, Result};
use crate::models::User;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

/// Fields for a registration-path insert
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub profile_image_url: String,
}

/// Fields for an OTP-provisioning insert
#[derive(Debug, Clone)]
pub struct NewPhoneUser {
    pub phone_number: String,
    pub username: String,
    pub password_hash: String,
    pub profile_image_url: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by phone number
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>>;

    /// Find user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find user by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Create a user on the registration path
    ///
    /// Unique violations surface as `EmailAlreadyExists` /
    /// `UsernameAlreadyExists` so a race that slips past the pre-insert
    /// checks is still reported as a conflict.
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    /// Conditionally insert a phone-provisioned user
    ///
    /// Insert-if-absent keyed on phone number: returns `Ok(Some(user))`
    /// when this call created the row, `Ok(None)` when an account for the
    /// phone already exists (the caller re-reads it). A username collision
    /// is reported as `UsernameAlreadyExists` so the caller can retry with
    /// a fresh synthetic username.
    async fn create_phone_user(&self, new_user: NewPhoneUser) -> Result<Option<User>>;

    /// Store a push notification token; returns false if the user is gone
    async fn update_push_token(&self, user_id: Uuid, push_token: &str) -> Result<bool>;
}

/// Postgres-backed user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a unique-constraint violation to the matching conflict error
fn map_unique_violation(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.constraint() {
            Some("users_email_key") => return AuthError::EmailAlreadyExists,
            Some("users_username_key") => return AuthError::UsernameAlreadyExists,
            _ => {}
        }
    }
    err.into()
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone_number = $1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, username, password_hash, profile_image_url, created_at, updated_at)
            VALUES (uuid_generate_v4(), $1, $2, $3, $4, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            RETURNING *
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(&new_user.profile_image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }

    async fn create_phone_user(&self, new_user: NewPhoneUser) -> Result<Option<User>> {
        // Conditional insert keyed on phone_number: concurrent provisioning
        // attempts for the same phone resolve to a single row.
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, phone_number, username, password_hash, profile_image_url, created_at, updated_at)
            VALUES (uuid_generate_v4(), $1, $2, $3, $4, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            ON CONFLICT (phone_number) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&new_user.phone_number)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(&new_user.profile_image_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }

    async fn update_push_token(&self, user_id: Uuid, push_token: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET push_token = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(user_id)
        .bind(push_token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
