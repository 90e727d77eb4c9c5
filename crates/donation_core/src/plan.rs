use std::collections::HashSet;

use crate::{Amount, DonationRecord, TrackedSet};

/// One state change the executor must apply, persist and (for claims) notify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Tracked record no longer on the page.
    Retract(DonationRecord),
    /// New qualifying record to append and notify.
    Claim(DonationRecord),
}

/// Pure diff of a snapshot against the tracked set.
///
/// All retractions come first, in tracked order, followed by claims in
/// snapshot order (freshest-first). A record must strictly exceed `minimum`
/// to be claimed, and a row repeated within one snapshot is claimed once.
pub fn plan_tick(
    snapshot: &[DonationRecord],
    tracked: &TrackedSet,
    minimum: Amount,
) -> Vec<Decision> {
    let on_page: HashSet<&DonationRecord> = snapshot.iter().collect();

    let mut decisions: Vec<Decision> = tracked
        .iter()
        .filter(|record| !on_page.contains(record))
        .cloned()
        .map(Decision::Retract)
        .collect();

    let mut claimed: HashSet<&DonationRecord> = HashSet::new();
    for record in snapshot {
        if !record.qualifies(minimum) || tracked.contains(record) {
            continue;
        }
        if claimed.insert(record) {
            decisions.push(Decision::Claim(record.clone()));
        }
    }

    decisions
}
