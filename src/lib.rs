//! URA Box Backend Library
//!
//! Engine layer for the URA Box lucky-draw platform: time-boxed raffle
//! events, XP-earning quiz/poll activities, XP-gated unlocks, and
//! exactly-once winner settlement. The presentation layer consumes the
//! services exposed through [`AppState`]; persistence goes through the
//! [`store::DocumentStore`] boundary.

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use clock::Clock;
use repositories::*;
use services::*;
use std::sync::Arc;
use store::DocumentStore;

/// Application state containing all repositories and services
pub struct AppState<S> {
    pub store: Arc<S>,
    pub event_repo: Arc<EventRepository<S>>,
    pub user_directory: Arc<UserDirectory<S>>,
    pub activity_repo: Arc<ActivityRepository<S>>,
    pub winner_service: Arc<WinnerService<S>>,
    pub registration_service: Arc<RegistrationService<S>>,
    pub quiz_service: Arc<QuizService<S>>,
    pub xp_service: Arc<XpService<S>>,
}

impl<S: DocumentStore> AppState<S> {
    /// Create a new AppState with initialized repositories and services
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        let event_repo = Arc::new(EventRepository::new(store.clone()));
        let user_directory = Arc::new(UserDirectory::new(store.clone()));
        let activity_repo = Arc::new(ActivityRepository::new(store.clone()));

        Self {
            winner_service: Arc::new(WinnerService::new(event_repo.clone(), clock.clone())),
            registration_service: Arc::new(RegistrationService::new(
                event_repo.clone(),
                user_directory.clone(),
                clock.clone(),
            )),
            quiz_service: Arc::new(QuizService::new(
                activity_repo.clone(),
                user_directory.clone(),
                clock,
            )),
            xp_service: Arc::new(XpService::new(user_directory.clone())),
            store,
            event_repo,
            user_directory,
            activity_repo,
        }
    }
}
