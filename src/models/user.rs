use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User model - core identity entity
///
/// Deliberately not `Serialize`: the password hash must never reach a
/// client. Responses use [`PublicUser`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub username: String,
    pub password_hash: String,
    pub profile_image_url: String,
    pub push_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a user record - the only user shape that is
/// serialized into responses
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    #[serde(rename = "phoneNumber", skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "profileImage")]
    pub profile_image: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            phone_number: user.phone_number.clone(),
            email: user.email.clone(),
            profile_image: user.profile_image_url.clone(),
            created_at: user.created_at,
        }
    }
}

// Request bodies use Option<String> so that a missing field maps to the
// field-specific 400 message instead of an extractor rejection.

/// OTP request body
#[derive(Debug, Deserialize)]
pub struct RequestOtpBody {
    pub phone: Option<String>,
}

/// OTP verification body
#[derive(Debug, Deserialize)]
pub struct VerifyOtpBody {
    pub phone: Option<String>,
    pub otp: Option<String>,
}

/// Registration body
#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Password login body
#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Push token update body
#[derive(Debug, Deserialize)]
pub struct UpdatePushTokenBody {
    #[serde(rename = "expoPushToken")]
    pub expo_push_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            phone_number: Some("+15551234567".to_string()),
            email: None,
            username: "user_123456".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            profile_image_url: "https://api.dicebear.com/9.x/personas/svg?seed=user_123456"
                .to_string(),
            push_token: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_projection_excludes_password_hash() {
        let user = sample_user();
        let public = PublicUser::from(&user);
        let json = serde_json::to_value(&public).unwrap();

        assert!(json.get("password_hash").is_none());
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["username"], "user_123456");
        assert_eq!(json["phoneNumber"], "+15551234567");
    }

    #[test]
    fn test_public_projection_omits_absent_identifiers() {
        let mut user = sample_user();
        user.phone_number = None;
        user.email = Some("a@x.com".to_string());

        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();

        assert!(json.get("phoneNumber").is_none());
        assert_eq!(json["email"], "a@x.com");
    }
}
