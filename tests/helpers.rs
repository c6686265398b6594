use std::sync::Arc;
use urabox_backend::clock::FixedClock;
use urabox_backend::models::*;
use urabox_backend::store::MemoryStore;
use urabox_backend::AppState;

/// Fixture "now": all test windows are laid out around this instant.
pub const NOW: i64 = 1_700_000_000_000;

pub const HOUR: i64 = 60 * 60 * 1000;

/// Test harness bundling an in-memory store, a pinned clock, and the full
/// engine stack.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub state: AppState<MemoryStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::at(NOW));
        let state = AppState::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            state,
        }
    }

    /// Jump the pinned clock past the given event's result time
    pub fn advance_past_result_time(&self, event: &LuckyEvent) {
        self.clock.set(event.result_time + 1);
    }

    /// Create a user and credit an XP balance
    pub async fn create_user_with_xp(&self, username: &str, xp: u64) -> UserRecord {
        self.state
            .user_directory
            .get_or_create(username)
            .await
            .expect("create user");
        if xp > 0 {
            self.state
                .user_directory
                .award_xp(username, xp)
                .await
                .expect("award xp")
        } else {
            self.state
                .user_directory
                .find_by_username(username)
                .await
                .expect("find user")
                .expect("user exists")
        }
    }

    /// Register the given usernames in order and return the created event
    pub async fn register_all(&self, event_id: &str, usernames: &[&str]) {
        for username in usernames {
            let outcome = self
                .state
                .registration_service
                .register_for_event(event_id, username)
                .await
                .expect("register");
            assert!(outcome.success, "registration failed: {}", outcome.message);
        }
    }
}

/// Event open for registration around NOW, results due an hour after close
pub fn open_event_draft(codes: &[&str]) -> EventDraft {
    EventDraft {
        name: "Launch Party".to_string(),
        start_time: NOW - HOUR,
        end_time: NOW + HOUR,
        result_time: NOW + 2 * HOUR,
        codes: codes.iter().map(|c| c.to_string()).collect(),
        selection_mode: SelectionMode::Random,
        custom_winner_slots: None,
        winner_slots: None,
        required_xp: None,
        is_highlighted: false,
        send_notification: false,
    }
}

/// XP-gated variant of the open event
pub fn gated_event_draft(codes: &[&str], required_xp: u64) -> EventDraft {
    EventDraft {
        required_xp: Some(required_xp),
        ..open_event_draft(codes)
    }
}

/// Quiz live around NOW with one mcq and one descriptive question
pub fn quiz_draft(xp: u64) -> ActivityDraft {
    ActivityDraft {
        title: "Friday Trivia".to_string(),
        start_time: NOW - HOUR,
        end_time: NOW + HOUR,
        xp,
        questions: vec![
            Question {
                question_type: "mcq".to_string(),
                prompt: "Pick one".to_string(),
                image_url: None,
                options: Some(vec!["red".to_string(), "green".to_string(), "blue".to_string()]),
                correct_option: Some(1),
            },
            Question {
                question_type: "descriptive".to_string(),
                prompt: "Tell us why".to_string(),
                image_url: None,
                options: None,
                correct_option: None,
            },
        ],
    }
}

/// Valid answers for `quiz_draft`
pub fn quiz_answers() -> Vec<AnswerValue> {
    vec![
        AnswerValue::Choice(1),
        AnswerValue::Text("because".to_string()),
    ]
}
