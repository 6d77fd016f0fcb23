//! Periodic inspection loop driving the scorer.

use std::sync::Arc;
use std::time::Duration;

use auto_impl::auto_impl;
use libp2p::PeerId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::scorer::PeerScorer;
use crate::snapshot::ScoreSnapshot;
use crate::traits::NetPeerId;

/// Supplies the current scores for every peer known to the scoring engine.
#[auto_impl(&, Box, Arc)]
pub trait ScoreSource<Id: NetPeerId = PeerId>: Send + Sync {
    fn snapshot(&self) -> ScoreSnapshot<Id>;
}

/// Handle to a running inspection loop.
///
/// Dropping the handle also stops the loop at its next wake-up.
#[derive(Debug)]
pub struct InspectionHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl InspectionHandle {
    /// Signals the loop to stop and waits for it. An evaluation in progress
    /// runs to completion first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Evaluates `source` every `period` until the returned handle is shut down.
///
/// Ticks missed because an evaluation overran are skipped rather than
/// replayed in a burst. Must be called within a tokio runtime.
pub fn spawn_inspection<Id, S>(
    scorer: Arc<PeerScorer<Id>>,
    source: S,
    period: Duration,
) -> InspectionHandle
where
    Id: NetPeerId,
    S: ScoreSource<Id> + 'static,
{
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(?period, "score inspection started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {
                    let snapshot = source.snapshot();
                    scorer.evaluate(&snapshot);
                }
            }
        }

        debug!("score inspection stopped");
    });

    InspectionHandle { shutdown, task }
}

impl<Id: NetPeerId> PeerScorer<Id> {
    /// Starts [`spawn_inspection`] with the configured inspection interval.
    pub fn start_inspection<S>(self: &Arc<Self>, source: S) -> InspectionHandle
    where
        S: ScoreSource<Id> + 'static,
    {
        spawn_inspection(Arc::clone(self), source, self.config().inspect_interval())
    }
}
