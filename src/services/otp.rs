/// One-time passcode store
///
/// Process-local ephemeral table mapping a phone number to its pending
/// code. Codes are short-lived secrets, not durable state: a restart
/// dropping pending codes just forces a re-request. The store owns the
/// full OTP lifecycle - create, validate, expire, consume - and no other
/// component touches the entries directly.
use dashmap::DashMap;
use rand::Rng;
use std::time::{Duration, Instant};

/// OTP code length
pub const OTP_LENGTH: usize = 6;

/// OTP expiration time (5 minutes)
pub const OTP_TTL: Duration = Duration::from_secs(5 * 60);

/// Outcome of an OTP verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpOutcome {
    /// Code matched and was within its validity window; entry consumed
    Valid,
    /// No pending code, or the supplied code did not match; entry untouched
    Invalid,
    /// Code matched but the validity window had passed; entry consumed
    Expired,
}

struct PendingOtp {
    code: String,
    expires_at: Instant,
}

/// Ephemeral keyed OTP store
///
/// Each entry is written as a whole value, and verification removes the
/// entry with a single atomic check-and-delete, so two concurrent
/// verifiers can never both observe `Valid` for the same code.
pub struct OtpStore {
    codes: DashMap<String, PendingOtp>,
    ttl: Duration,
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            codes: DashMap::new(),
            ttl,
        }
    }

    /// Generate and store a fresh code for a phone number
    ///
    /// Overwrites any pending code for the same phone - at most one
    /// entry per phone exists at any time. Returns the code for
    /// out-of-band delivery.
    pub fn request(&self, phone: &str) -> String {
        let code = Self::generate_code();
        self.codes.insert(
            phone.to_string(),
            PendingOtp {
                code: code.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        code
    }

    /// Check a supplied code against the pending entry for a phone
    ///
    /// A matching code consumes the entry whether or not it expired
    /// (single use either way); a wrong guess leaves the real code
    /// pending so a correct guess may still follow.
    pub fn verify(&self, phone: &str, supplied_code: &str) -> OtpOutcome {
        // Atomic check-and-delete: the entry is removed only when the code
        // matches, under the per-key lock.
        match self
            .codes
            .remove_if(phone, |_, pending| pending.code == supplied_code)
        {
            Some((_, pending)) => {
                if Instant::now() > pending.expires_at {
                    OtpOutcome::Expired
                } else {
                    OtpOutcome::Valid
                }
            }
            None => OtpOutcome::Invalid,
        }
    }

    /// Drop entries whose validity window has passed
    ///
    /// Expiry is evaluated lazily at verification; this bounds retention
    /// for abandoned phone numbers.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.codes.retain(|_, pending| now <= pending.expires_at);
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Uniformly random 6-digit numeric code, leading zeros allowed
    fn generate_code() -> String {
        let mut rng = rand::thread_rng();
        (0..OTP_LENGTH)
            .map(|_| rng.gen_range(0..10).to_string())
            .collect()
    }
}

impl Default for OtpStore {
    fn default() -> Self {
        Self::new(OTP_TTL)
    }
}
