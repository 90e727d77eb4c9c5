//! Donation core: record model, tracked set and per-tick diff planning.
mod amount;
mod plan;
mod record;
mod report;
mod tracked;

pub use amount::{Amount, AmountError};
pub use plan::{plan_tick, Decision};
pub use record::DonationRecord;
pub use report::TickReport;
pub use tracked::TrackedSet;
