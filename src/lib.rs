/// Bookworm Identity Service Library
///
/// Provides authentication and session issuance for the Bookworm backend.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `db`: User repository (Postgres)
/// - `error`: Error types
/// - `http`: axum router, handlers, bearer middleware
/// - `models`: Data models
/// - `security`: JWT issuance, password hashing
/// - `services`: Business logic (OTP store, phone auth, email auth)
/// - `validators`: Input validation
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod security;
pub mod services;
pub mod validators;

// Re-export commonly used types
pub use error::{AuthError, Result};
