/// Service layer for the identity service
///
/// Business logic behind the auth gateway:
/// - OTP store (process-local code lifecycle)
/// - Phone authentication (OTP protocols + account provisioning)
/// - Email authentication (registration + password login)
pub mod email_auth;
pub mod otp;
pub mod phone_auth;

pub use email_auth::{EmailAuthService, EmailLoginResult};
pub use otp::{OtpOutcome, OtpStore, OTP_TTL};
pub use phone_auth::{OtpRequested, PhoneAuthService, PhoneLoginResult};
