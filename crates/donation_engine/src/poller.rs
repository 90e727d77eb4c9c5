use std::time::Duration;

use donation_core::{Amount, DonationRecord, TickReport, TrackedSet};
use engine_logging::{engine_debug, engine_error, engine_info, set_poll_tick};
use tokio_util::sync::CancellationToken;

use crate::{
    run_tick, Notifier, PersistError, SnapshotError, SnapshotSource, StateStore, TrackedState,
};

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    /// Donations must be strictly greater than this to be announced.
    pub minimum_amount: Amount,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            minimum_amount: Amount::from_dollars(24),
        }
    }
}

/// The single polling loop: fetch, reconcile, sleep.
///
/// Owns the tracked state outright; nothing else reads or writes it while
/// the loop runs, so no locking is involved.
pub struct Poller<Src, N, S: StateStore> {
    source: Src,
    notifier: N,
    state: TrackedState<S>,
    settings: PollSettings,
    tick: u64,
}

impl<Src, N, S> Poller<Src, N, S>
where
    Src: SnapshotSource,
    N: Notifier,
    S: StateStore,
{
    pub fn new(source: Src, notifier: N, state: TrackedState<S>, settings: PollSettings) -> Self {
        Self {
            source,
            notifier,
            state,
            settings,
            tick: 0,
        }
    }

    pub fn tracked(&self) -> &TrackedSet {
        self.state.tracked()
    }

    /// One fetch-and-reconcile pass. `Ok(None)` means no snapshot was
    /// available and nothing changed.
    pub async fn tick(&mut self) -> Result<Option<TickReport>, PersistError> {
        self.begin_tick();
        let snapshot = self.source.snapshot().await;
        self.reconcile(snapshot).await
    }

    /// Runs until `shutdown` fires, then saves once more and hands back the
    /// final tracked set.
    ///
    /// Shutdown during the page fetch abandons the fetch. Shutdown during
    /// reconciliation lets the pass and its saves finish first.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<TrackedSet, PersistError> {
        engine_info!(
            "Polling every {:?} for donations above ${} ({} already tracked)",
            self.settings.interval,
            self.settings.minimum_amount,
            self.state.tracked().len()
        );

        while !shutdown.is_cancelled() {
            self.begin_tick();
            let snapshot = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.source.snapshot() => result,
            };
            self.reconcile(snapshot).await?;

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        set_poll_tick(0);
        engine_info!("Shutdown requested, saving tracked donations");
        self.state.persist().await?;
        Ok(self.state.into_tracked())
    }

    fn begin_tick(&mut self) {
        self.tick += 1;
        set_poll_tick(self.tick);
    }

    async fn reconcile(
        &mut self,
        snapshot: Result<Vec<DonationRecord>, SnapshotError>,
    ) -> Result<Option<TickReport>, PersistError> {
        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(err) => {
                engine_error!("Snapshot unavailable, skipping tick: {}", err);
                return Ok(None);
            }
        };

        let report = run_tick(
            &mut self.state,
            &self.notifier,
            &snapshot,
            self.settings.minimum_amount,
        )
        .await?;

        if report.changed() {
            engine_info!(
                "{} rows, {} new, {} announced, {} failed, {} retracted, {} tracked",
                snapshot.len(),
                report.claimed,
                report.notified,
                report.notify_failed,
                report.retracted,
                self.state.tracked().len()
            );
        } else {
            engine_debug!("{} rows, nothing new", snapshot.len());
        }
        Ok(Some(report))
    }
}
