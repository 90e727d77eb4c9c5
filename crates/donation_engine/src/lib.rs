//! Donation engine: page fetch, snapshot parsing, persistence, notification
//! and the polling loop that ties them to the core reconciliation plan.
mod decode;
mod fetch;
mod notify;
mod persist;
mod poller;
mod reconcile;
mod reddit;
mod snapshot;
mod types;

pub use decode::decode_page;
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use notify::{format_donation_message, Notifier, NotifyError, NotifyReceipt};
pub use persist::{
    ensure_output_dir, AtomicFileWriter, JsonStateStore, PersistError, PersistPolicy, StateStore,
    TrackedState,
};
pub use poller::{PollSettings, Poller};
pub use reconcile::run_tick;
pub use reddit::{RedditCredentials, RedditNotifier, RedditSettings};
pub use snapshot::{
    DonorTableParser, PageSnapshotSource, SnapshotError, SnapshotSource, TableLayout,
};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
