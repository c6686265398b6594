use crate::clock::Clock;
use crate::error::AppResult;
use crate::repositories::EventRepository;
use crate::services::WinnerService;
use crate::store::DocumentStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

/// Background task that settles events whose result time has passed.
///
/// Settlement is lazy and idempotent, so the poller is just one more
/// caller of the Winner Engine; a user loading the result page first
/// produces the same outcome.
pub struct ResultPoller<S> {
    event_repo: Arc<EventRepository<S>>,
    winner_service: Arc<WinnerService<S>>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl<S: DocumentStore> ResultPoller<S> {
    pub fn new(
        event_repo: Arc<EventRepository<S>>,
        winner_service: Arc<WinnerService<S>>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            event_repo,
            winner_service,
            clock,
            poll_interval,
        }
    }

    /// Start the poller loop
    pub async fn start(self) {
        let mut interval = time::interval(self.poll_interval);
        info!(
            "Result poller started, sweeping every {:?}",
            self.poll_interval
        );

        loop {
            interval.tick().await;

            match self.settle_due_events().await {
                Ok(0) => {}
                Ok(settled) => info!("Result poller settled {} event(s)", settled),
                Err(e) => error!("Result poller sweep failed: {}", e),
            }
        }
    }

    /// Settle every unsettled event whose result time has passed
    pub async fn settle_due_events(&self) -> AppResult<usize> {
        let now = self.clock.now_millis();
        let mut settled = 0;

        for event in self.event_repo.list().await? {
            if event.is_settled() || !event.results_due(now) {
                continue;
            }
            match self.winner_service.determine_winners(&event.id).await {
                Ok(after) if after.is_settled() => settled += 1,
                Ok(_) => {}
                Err(e) => error!("Could not settle event {}: {}", event.id, e),
            }
        }
        Ok(settled)
    }
}
