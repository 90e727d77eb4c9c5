use donation_core::{plan_tick, Amount, Decision, DonationRecord, TickReport};
use engine_logging::{engine_debug, engine_error};

use crate::{Notifier, NotifyError, PersistError, StateStore, TrackedState};

/// Applies one snapshot to the tracked state.
///
/// Each decision is persisted on its own: one save per retraction, and one
/// save per claim after its notification attempt, whatever the outcome. A
/// claimed record is never notified again, even if delivery failed.
pub async fn run_tick<S, N>(
    state: &mut TrackedState<S>,
    notifier: &N,
    snapshot: &[DonationRecord],
    minimum: Amount,
) -> Result<TickReport, PersistError>
where
    S: StateStore,
    N: Notifier + ?Sized,
{
    let mut report = TickReport::default();
    for decision in plan_tick(snapshot, state.tracked(), minimum) {
        if !state.apply(&decision) {
            continue;
        }
        match &decision {
            Decision::Retract(record) => {
                engine_debug!("Donation by {} no longer listed", record.donor_name);
                report.retracted += 1;
            }
            Decision::Claim(record) => {
                engine_debug!("New donation by {}", record.donor_name);
                report.claimed += 1;
                match notifier.notify(record).await {
                    Ok(_) => report.notified += 1,
                    Err(err) => {
                        report.notify_failed += 1;
                        log_notify_failure(record, &err);
                    }
                }
            }
        }
        state.persist().await?;
    }
    Ok(report)
}

fn log_notify_failure(record: &DonationRecord, err: &NotifyError) {
    match err {
        NotifyError::ThreadNotFound { .. } => {
            engine_error!(
                "CRITICAL: {}; donation by {} will not be announced",
                err,
                record.donor_name
            );
        }
        _ => engine_error!(
            "Failed to post donation by {}: {}",
            record.donor_name,
            err
        ),
    }
}
