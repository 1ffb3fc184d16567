//! Background trigger sweep.
//!
//! [`TriggerSweep`] runs as a long-lived task: every interval it walks
//! the requests that still have an item awaiting a decision, processes
//! their trigger rules, and dispatches the resulting notifications. Each
//! request is isolated — one failing request is logged and skipped so it
//! cannot abort the rest of the pass.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use prolong_core::types::DbId;
use prolong_db::repositories::RequestRepo;
use prolong_db::DbPool;
use prolong_events::{aggregate, NotificationDispatcher};
use prolong_pipeline::{process_triggers, PipelineConfig, PipelineError};

/// Background service that periodically processes triggers for every
/// open request.
pub struct TriggerSweep {
    pool: DbPool,
    config: PipelineConfig,
    dispatcher: NotificationDispatcher,
}

impl TriggerSweep {
    pub fn new(pool: DbPool, config: PipelineConfig, dispatcher: NotificationDispatcher) -> Self {
        Self {
            pool,
            config,
            dispatcher,
        }
    }

    /// Run the sweep loop.
    ///
    /// Processes a pass every `sweep_interval_secs`. The loop exits
    /// gracefully when the provided [`CancellationToken`] is cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.sweep_interval_secs));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Trigger sweep cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.process_open_requests().await {
                        tracing::error!(error = %e, "Trigger sweep pass failed");
                    }
                }
            }
        }
    }

    /// One pass over every open request. Only the work-list query can
    /// fail the pass; per-request errors are contained.
    pub async fn process_open_requests(&self) -> Result<(), sqlx::Error> {
        let request_ids = RequestRepo::list_open_ids(&self.pool).await?;
        let total = request_ids.len();

        let mut fired_total = 0;
        for request_id in request_ids {
            match self.process_one(request_id).await {
                Ok(fired) => fired_total += fired,
                Err(e) => {
                    tracing::error!(
                        request_id,
                        error = %e,
                        "Failed to process triggers for request"
                    );
                }
            }
        }

        if total > 0 {
            tracing::info!(
                requests = total,
                fired = fired_total,
                "Trigger sweep pass complete"
            );
        }
        Ok(())
    }

    /// Process one request and dispatch its notifications. Returns how
    /// many rules fired.
    async fn process_one(&self, request_id: DbId) -> Result<usize, PipelineError> {
        let fired = process_triggers(&self.pool, &self.config, request_id, Utc::now()).await?;
        if fired.is_empty() {
            return Ok(0);
        }

        let request = RequestRepo::find_by_id(&self.pool, request_id)
            .await?
            .ok_or(PipelineError::RequestNotFound(request_id))?;
        let messages = aggregate(&request, &fired);
        self.dispatcher.dispatch(&messages).await?;
        Ok(fired.len())
    }
}
