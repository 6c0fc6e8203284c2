/// Security primitives for the identity service
///
/// - Password hashing and verification (Argon2id)
/// - Session token issuance (JWT, HS256)
pub mod jwt;
pub mod password;

pub use jwt::{Claims, TokenIssuer};
pub use password::{hash_password, verify_password};
