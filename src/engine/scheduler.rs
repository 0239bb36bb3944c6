//! Background scheduler: periodic reconciliation, periodic view refresh,
//! and orderly shutdown, serialized onto a single select point.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use super::model::Bucket;
use super::reconcile::RefreshSummary;
use super::Engine;
use crate::feed::FeedTransport;
use crate::storage::ArticleStore;

/// Events emitted toward the presentation layer.
#[derive(Debug)]
pub enum EngineEvent {
    /// A reconciliation cycle completed; re-render feed and article lists.
    Refreshed(RefreshSummary),
    /// A reconciliation cycle failed at the store layer.
    RefreshFailed(String),
    /// Pure view refresh: re-render timestamps and derived fields, no fetch.
    ViewTick,
}

/// Timer configuration for the scheduler task.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Interval between reconciliation cycles.
    pub update_interval: Duration,
    /// Interval between pure view refreshes.
    pub view_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(300),
            view_interval: Duration::from_secs(30),
        }
    }
}

/// Drive the engine's background work until shutdown.
///
/// The three event sources — reconcile timer, view timer, shutdown signal —
/// meet at one `select!`, so at most one of them runs at a time from the
/// engine's perspective. The fetch fan-out inside `refresh()` is the only
/// intra-cycle concurrency. Shutdown breaks the loop; an in-flight fetch of
/// the current arm completes and its result is discarded with the task.
pub async fn run_scheduler<S: ArticleStore, T: FeedTransport>(
    engine: Arc<Engine<S, T>>,
    config: SchedulerConfig,
    events: mpsc::Sender<EngineEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let start = tokio::time::Instant::now();
    // The caller runs an initial cycle before spawning us, so the first tick
    // waits a full interval instead of firing immediately.
    let mut update = tokio::time::interval_at(start + config.update_interval, config.update_interval);
    update.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut view = tokio::time::interval_at(start + config.view_interval, config.view_interval);
    view.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // A closed channel means the sender is gone; treat it as shutdown.
            _ = shutdown.changed() => {
                tracing::info!("Scheduler shutting down");
                break;
            }

            _ = update.tick() => {
                match engine.refresh().await {
                    Ok(summary) => {
                        if let Err(e) = engine.purge().await {
                            tracing::warn!(error = %e, "Retention purge failed");
                        }
                        let _ = events.send(EngineEvent::Refreshed(summary)).await;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Reconciliation cycle failed");
                        let _ = events.send(EngineEvent::RefreshFailed(e.to_string())).await;
                    }
                }
            }

            _ = view.tick() => {
                // A re-render of the unread bucket would drop the just-read
                // article out from under the cursor; skip it there.
                if engine.active_feed() != Bucket::Unread {
                    let _ = events.send(EngineEvent::ViewTick).await;
                }
            }
        }
    }
}
