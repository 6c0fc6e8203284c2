/// Email Authentication Service
///
/// Registration (email/username/password) and password login. All
/// validation and uniqueness checks run before any write, so a failed
/// registration leaves no partial state.
use crate::db::{NewUser, UserRepository};
use crate::error::{AuthError, Result};
use crate::models::User;
use crate::security::{hash_password, verify_password, TokenIssuer};
use crate::validators::{validate_email, MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH};
use std::sync::Arc;
use tracing::info;

const AVATAR_URL_BASE: &str = "https://api.dicebear.com/9.x/personas/svg";

/// Email authentication service
#[derive(Clone)]
pub struct EmailAuthService {
    repo: Arc<dyn UserRepository>,
    tokens: Arc<TokenIssuer>,
}

/// Result of a successful registration or login
#[derive(Debug)]
pub struct EmailLoginResult {
    pub token: String,
    pub user: User,
}

impl EmailAuthService {
    pub fn new(repo: Arc<dyn UserRepository>, tokens: Arc<TokenIssuer>) -> Self {
        Self { repo, tokens }
    }

    /// Register a new user with email, username, and password
    ///
    /// Email uniqueness is checked before username uniqueness: when both
    /// collide, the email conflict is the one reported.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<EmailLoginResult> {
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(
                "Password should be at least 6 characters long".to_string(),
            ));
        }

        if username.len() < MIN_USERNAME_LENGTH {
            return Err(AuthError::Validation(
                "Username should be at least 3 characters long".to_string(),
            ));
        }

        if !validate_email(email) {
            return Err(AuthError::Validation(
                "Invalid email address format".to_string(),
            ));
        }

        if self.repo.find_by_email(email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        if self.repo.find_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameAlreadyExists);
        }

        let password_hash = hash_password(password)?;

        let user = self
            .repo
            .create_user(NewUser {
                email: email.to_string(),
                username: username.to_string(),
                password_hash,
                profile_image_url: avatar_url(username),
            })
            .await?;

        let token = self.tokens.issue(user.id)?;

        info!(
            user_id = %user.id,
            username = %user.username,
            email = %mask_email(email),
            "User registered"
        );

        Ok(EmailLoginResult { token, user })
    }

    /// Log in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<EmailLoginResult> {
        let user = self
            .repo
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;

        info!(
            user_id = %user.id,
            email = %mask_email(email),
            "User logged in"
        );

        Ok(EmailLoginResult { token, user })
    }
}

/// Deterministic avatar URL seeded by the username
fn avatar_url(username: &str) -> String {
    format!("{}?seed={}", AVATAR_URL_BASE, username)
}

/// Mask an email for logging
fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let local = &email[..at_pos];
        let domain = &email[at_pos..];
        if local.len() <= 2 {
            format!("**{}", domain)
        } else {
            format!("{}***{}", &local[..1], domain)
        }
    } else {
        "***@***".to_string()
    }
}
