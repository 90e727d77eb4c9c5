#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, Once};

use donation_core::{Amount, DonationRecord, TrackedSet};
use donation_engine::{
    Notifier, NotifyError, NotifyReceipt, PersistError, SnapshotError, SnapshotSource, StateStore,
};
use tokio_util::sync::CancellationToken;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub fn donation(name: &str, cents: u64) -> DonationRecord {
    DonationRecord::new(
        name,
        "Somewhere",
        Amount::from_cents(cents),
        format!("Go {name}!\nSecond line"),
    )
}

pub fn minimum() -> Amount {
    Amount::from_dollars(24)
}

/// Store that remembers every save and can be told to fail the next few.
#[derive(Default)]
pub struct RecordingStore {
    initial: TrackedSet,
    saves: Mutex<Vec<TrackedSet>>,
    failures_left: AtomicU32,
}

impl RecordingStore {
    pub fn with_initial(initial: TrackedSet) -> Self {
        Self {
            initial,
            ..Self::default()
        }
    }

    pub fn fail_next(&self, count: u32) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn last_saved(&self) -> Option<TrackedSet> {
        self.saves.lock().unwrap().last().cloned()
    }
}

impl StateStore for RecordingStore {
    fn load(&self) -> TrackedSet {
        self.initial.clone()
    }

    fn save(&self, tracked: &TrackedSet) -> Result<(), PersistError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(PersistError::Io(io::Error::other("disk full")));
        }
        self.saves.lock().unwrap().push(tracked.clone());
        Ok(())
    }
}

/// Notifier that records calls and fails for selected donors.
#[derive(Default)]
pub struct ScriptedNotifier {
    calls: Mutex<Vec<DonationRecord>>,
    failing: Vec<String>,
    thread_missing: bool,
}

impl ScriptedNotifier {
    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn without_thread() -> Self {
        Self {
            thread_missing: true,
            ..Self::default()
        }
    }

    pub fn called_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.donor_name.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Notifier for ScriptedNotifier {
    async fn notify(&self, record: &DonationRecord) -> Result<NotifyReceipt, NotifyError> {
        self.calls.lock().unwrap().push(record.clone());
        if self.thread_missing {
            return Err(NotifyError::ThreadNotFound {
                title: "Discussion Thread".into(),
                author: "bot".into(),
            });
        }
        if self.failing.contains(&record.donor_name) {
            return Err(NotifyError::Transport("connection reset".into()));
        }
        Ok(NotifyReceipt {
            comment_id: format!("t1_{}", record.donor_name),
            pinned: true,
        })
    }
}

/// Serves queued snapshots in order, then trips `shutdown`.
pub struct QueuedSource {
    queue: Mutex<VecDeque<Result<Vec<DonationRecord>, SnapshotError>>>,
    shutdown: CancellationToken,
    served: AtomicU32,
}

impl QueuedSource {
    pub fn new(
        snapshots: Vec<Result<Vec<DonationRecord>, SnapshotError>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue: Mutex::new(snapshots.into()),
            shutdown,
            served: AtomicU32::new(0),
        }
    }

    pub fn served(&self) -> u32 {
        self.served.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SnapshotSource for QueuedSource {
    async fn snapshot(&self) -> Result<Vec<DonationRecord>, SnapshotError> {
        self.served.fetch_add(1, Ordering::SeqCst);
        let (next, drained) = {
            let mut queue = self.queue.lock().unwrap();
            let next = queue.pop_front();
            (next, queue.is_empty())
        };
        if drained {
            self.shutdown.cancel();
        }
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}
