/// Database operations for the identity service
pub mod users;

pub use users::{NewPhoneUser, NewUser, PgUserRepository, UserRepository};

#[cfg(test)]
pub use users::MockUserRepository;
