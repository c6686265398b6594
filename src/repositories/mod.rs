pub mod activity_repository;
pub mod event_repository;
pub mod user_repository;

// Re-export all repositories for convenient access
pub use activity_repository::ActivityRepository;
pub use event_repository::EventRepository;
pub use user_repository::{normalize_username, SettleOutcome, UnlockOutcome, UserDirectory};
