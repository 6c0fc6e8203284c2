/// Phone Authentication Service
///
/// OTP request/verify protocols plus lazy account provisioning on first
/// successful verification. Code delivery is out of scope: the generated
/// code is emitted to the structured log for out-of-band delivery, the
/// rest of the lifecycle lives in the [`OtpStore`].
use crate::db::{NewPhoneUser, UserRepository};
use crate::error::{AuthError, Result};
use crate::models::User;
use crate::security::{hash_password, TokenIssuer};
use crate::services::otp::{OtpOutcome, OtpStore};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use tracing::{info, warn};

/// Bounded retries for synthetic username generation; uniqueness is
/// enforced by the repository constraint, not assumed a priori.
const MAX_USERNAME_ATTEMPTS: usize = 5;

const AVATAR_URL_BASE: &str = "https://api.dicebear.com/9.x/personas/svg";

/// Phone authentication service
#[derive(Clone)]
pub struct PhoneAuthService {
    repo: Arc<dyn UserRepository>,
    otp_store: Arc<OtpStore>,
    tokens: Arc<TokenIssuer>,
}

/// Result of an OTP request
#[derive(Debug)]
pub struct OtpRequested {
    /// True iff no account existed for the phone at request time. A
    /// point-in-time hint only; provisioning happens at verification.
    pub is_new_user: bool,
}

/// Result of a successful OTP verification
#[derive(Debug)]
pub struct PhoneLoginResult {
    pub token: String,
    pub user: User,
}

impl PhoneAuthService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        otp_store: Arc<OtpStore>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            repo,
            otp_store,
            tokens,
        }
    }

    /// Generate and stage an OTP for a phone number
    ///
    /// Does not provision an account; the existence lookup only feeds
    /// the `isNewUser` hint in the response.
    pub async fn request_otp(&self, phone: &str) -> Result<OtpRequested> {
        let code = self.otp_store.request(phone);

        // Delivery transport is out of scope - log the code for
        // out-of-band delivery during development.
        warn!(
            phone = %mask_phone(phone),
            otp = %code,
            "SMS delivery not configured - OTP logged for development"
        );

        let existing = self.repo.find_by_phone(phone).await?;

        Ok(OtpRequested {
            is_new_user: existing.is_none(),
        })
    }

    /// Verify an OTP, provisioning the account if needed, and issue a
    /// session token
    pub async fn verify_otp(&self, phone: &str, code: &str) -> Result<PhoneLoginResult> {
        match self.otp_store.verify(phone, code) {
            OtpOutcome::Invalid => return Err(AuthError::InvalidOtp),
            OtpOutcome::Expired => return Err(AuthError::OtpExpired),
            OtpOutcome::Valid => {}
        }

        let user = self.ensure_user_by_phone(phone).await?;
        let token = self.tokens.issue(user.id)?;

        info!(
            user_id = %user.id,
            phone = %mask_phone(phone),
            "User logged in with phone OTP"
        );

        Ok(PhoneLoginResult { token, user })
    }

    /// Idempotently resolve a phone number to a user account
    ///
    /// Returns the existing account unchanged when present. Otherwise
    /// synthesizes a username, avatar, and unusable placeholder password,
    /// and creates the account with a conditional insert so a concurrent
    /// duplicate-phone request still yields a single row. A synthetic
    /// username collision retries generation with a fresh random suffix.
    pub async fn ensure_user_by_phone(&self, phone: &str) -> Result<User> {
        if let Some(user) = self.repo.find_by_phone(phone).await? {
            return Ok(user);
        }

        for attempt in 0..MAX_USERNAME_ATTEMPTS {
            let username = if attempt == 0 {
                timestamp_username()
            } else {
                random_username()
            };
            let password_hash = hash_password(&placeholder_password())?;

            let new_user = NewPhoneUser {
                phone_number: phone.to_string(),
                profile_image_url: avatar_url(&username),
                username,
                password_hash,
            };

            match self.repo.create_phone_user(new_user).await {
                Ok(Some(user)) => {
                    info!(
                        user_id = %user.id,
                        username = %user.username,
                        phone = %mask_phone(phone),
                        "Provisioned user from phone verification"
                    );
                    return Ok(user);
                }
                Ok(None) => {
                    // Lost the insert race: another request created the
                    // account for this phone in the meantime.
                    if let Some(user) = self.repo.find_by_phone(phone).await? {
                        return Ok(user);
                    }
                }
                Err(AuthError::UsernameAlreadyExists) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(AuthError::Internal(
            "Could not allocate a unique username for phone provisioning".to_string(),
        ))
    }
}

/// Synthetic username from the millisecond timestamp suffix
fn timestamp_username() -> String {
    format!(
        "user_{:06}",
        Utc::now().timestamp_millis().rem_euclid(1_000_000)
    )
}

/// Synthetic username with a random suffix, for collision retries
fn random_username() -> String {
    format!("user_{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Deterministic avatar URL seeded by the username
fn avatar_url(username: &str) -> String {
    format!("{}?seed={}", AVATAR_URL_BASE, username)
}

/// Random unusable password for phone-provisioned accounts; these are
/// never authenticated by password.
fn placeholder_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

/// Mask a phone number for logging
///
/// Counts characters, not bytes: the input is client-supplied and only
/// checked for presence before it reaches the log field.
fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockUserRepository;
    use crate::security::jwt::SESSION_EXPIRY_DAYS;
    use crate::services::otp::OTP_TTL;
    use mockall::Sequence;
    use uuid::Uuid;

    fn phone_user(phone: &str) -> User {
        let username = timestamp_username();
        User {
            id: Uuid::new_v4(),
            phone_number: Some(phone.to_string()),
            email: None,
            profile_image_url: avatar_url(&username),
            username,
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            push_token: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(repo: MockUserRepository) -> PhoneAuthService {
        PhoneAuthService::new(
            Arc::new(repo),
            Arc::new(OtpStore::new(OTP_TTL)),
            Arc::new(TokenIssuer::new("test-secret", SESSION_EXPIRY_DAYS).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_ensure_user_creates_once_then_reuses() {
        let phone = "+15551234567";
        let created = phone_user(phone);
        let created_id = created.id;

        let mut repo = MockUserRepository::new();
        let mut seq = Sequence::new();

        // First call: no account, conditional insert creates one
        repo.expect_find_by_phone()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        let inserted = created.clone();
        repo.expect_create_phone_user()
            .times(1)
            .in_sequence(&mut seq)
            .withf(move |new_user| new_user.phone_number == "+15551234567")
            .returning(move |_| Ok(Some(inserted.clone())));
        // Second call: account exists, no write happens
        let existing = created.clone();
        repo.expect_find_by_phone()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(existing.clone())));

        let service = service(repo);

        let first = service.ensure_user_by_phone(phone).await.unwrap();
        let second = service.ensure_user_by_phone(phone).await.unwrap();

        assert_eq!(first.id, created_id);
        assert_eq!(second.id, created_id);
    }

    #[tokio::test]
    async fn test_ensure_user_synthesizes_expected_defaults() {
        let phone = "+15559876543";

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_phone().returning(|_| Ok(None));
        repo.expect_create_phone_user()
            .times(1)
            .withf(|new_user| {
                new_user.username.starts_with("user_")
                    && new_user.username.len() == "user_".len() + 6
                    && new_user.username["user_".len()..]
                        .chars()
                        .all(|c| c.is_ascii_digit())
                    && new_user.profile_image_url
                        == format!(
                            "https://api.dicebear.com/9.x/personas/svg?seed={}",
                            new_user.username
                        )
                    && new_user.password_hash.starts_with("$argon2")
            })
            .returning(|new_user| {
                Ok(Some(User {
                    id: Uuid::new_v4(),
                    phone_number: Some(new_user.phone_number),
                    email: None,
                    username: new_user.username,
                    password_hash: new_user.password_hash,
                    profile_image_url: new_user.profile_image_url,
                    push_token: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                }))
            });

        let service = service(repo);
        let user = service.ensure_user_by_phone(phone).await.unwrap();

        assert_eq!(user.phone_number.as_deref(), Some(phone));
    }

    #[tokio::test]
    async fn test_ensure_user_retries_on_username_collision() {
        let phone = "+15550001111";
        let created = phone_user(phone);
        let created_id = created.id;

        let mut repo = MockUserRepository::new();
        let mut seq = Sequence::new();

        repo.expect_find_by_phone()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        repo.expect_create_phone_user()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AuthError::UsernameAlreadyExists));
        repo.expect_create_phone_user()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(created.clone())));

        let service = service(repo);
        let user = service.ensure_user_by_phone(phone).await.unwrap();

        assert_eq!(user.id, created_id);
    }

    #[tokio::test]
    async fn test_verify_otp_invalid_code_fails_without_provisioning() {
        let repo = MockUserRepository::new();
        let service = service(repo);

        let err = service
            .verify_otp("+15551234567", "000000")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidOtp));
    }

    #[tokio::test]
    async fn test_verify_otp_issues_decodable_token() {
        let phone = "+15551234567";
        let user = phone_user(phone);
        let user_id = user.id;

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_phone()
            .returning(move |_| Ok(Some(user.clone())));

        let tokens = Arc::new(TokenIssuer::new("test-secret", SESSION_EXPIRY_DAYS).unwrap());
        let otp_store = Arc::new(OtpStore::new(OTP_TTL));
        let service = PhoneAuthService::new(Arc::new(repo), otp_store.clone(), tokens.clone());

        let code = otp_store.request(phone);
        let result = service.verify_otp(phone, &code).await.unwrap();

        let claims = tokens.decode(&result.token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+15551234567"), "****4567");
        assert_eq!(mask_phone("+1"), "****");
    }

    #[test]
    fn test_mask_phone_multibyte_input() {
        // Presence is the only check upstream, so arbitrary UTF-8 can
        // reach the log field
        assert_eq!(mask_phone("ファクス"), "****");
        assert_eq!(mask_phone("電話番号12345"), "****2345");
    }
}
