pub mod quiz_service;
pub mod registration_service;
pub mod result_poller;
pub mod selection;
pub mod winner_service;
pub mod xp_service;

pub use quiz_service::QuizService;
pub use registration_service::RegistrationService;
pub use result_poller::ResultPoller;
pub use selection::{select_winners, Selection};
pub use winner_service::WinnerService;
pub use xp_service::XpService;
