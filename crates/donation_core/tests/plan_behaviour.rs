use std::sync::Once;

use donation_core::{plan_tick, Amount, Decision, DonationRecord, TrackedSet};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn donation(name: &str, cents: u64) -> DonationRecord {
    DonationRecord::new(name, "Somewhere", Amount::from_cents(cents), format!("from {name}"))
}

fn minimum() -> Amount {
    Amount::from_dollars(24)
}

fn apply_all(tracked: &mut TrackedSet, decisions: &[Decision]) {
    for decision in decisions {
        tracked.apply(decision);
    }
}

#[test]
fn fresh_snapshot_claims_in_snapshot_order() {
    init_logging();
    let snapshot = vec![donation("C", 5_000), donation("D", 3_000), donation("E", 10_000)];
    let decisions = plan_tick(&snapshot, &TrackedSet::new(), minimum());

    assert_eq!(
        decisions,
        vec![
            Decision::Claim(donation("C", 5_000)),
            Decision::Claim(donation("D", 3_000)),
            Decision::Claim(donation("E", 10_000)),
        ]
    );
}

#[test]
fn same_snapshot_twice_claims_nothing_the_second_time() {
    init_logging();
    let snapshot = vec![donation("A", 2_500), donation("B", 9_900)];
    let mut tracked = TrackedSet::new();

    let first = plan_tick(&snapshot, &tracked, minimum());
    assert_eq!(first.len(), 2);
    apply_all(&mut tracked, &first);

    let second = plan_tick(&snapshot, &tracked, minimum());
    assert!(second.is_empty());
}

#[test]
fn threshold_is_strict() {
    init_logging();
    let exact = donation("Exact", 2_400);
    let above = donation("Above", 2_401);
    let decisions = plan_tick(&[exact, above.clone()], &TrackedSet::new(), minimum());

    assert_eq!(decisions, vec![Decision::Claim(above)]);
}

#[test]
fn missing_tracked_records_are_retracted_before_claims() {
    init_logging();
    let a = donation("A", 5_000);
    let b = donation("B", 5_000);
    let c = donation("C", 5_000);
    let tracked = TrackedSet::from_records([a.clone(), b.clone()]);

    let decisions = plan_tick(&[c.clone(), b], &tracked, minimum());

    assert_eq!(decisions, vec![Decision::Retract(a), Decision::Claim(c)]);
}

#[test]
fn below_minimum_rows_never_retract_or_claim() {
    init_logging();
    let small = donation("Small", 500);
    let decisions = plan_tick(&[small.clone()], &TrackedSet::new(), minimum());
    assert!(decisions.is_empty());

    // Still on the page, so a tracked copy (from an older, lower minimum) stays.
    let tracked = TrackedSet::from_records([small.clone()]);
    assert!(plan_tick(&[small], &tracked, minimum()).is_empty());
}

#[test]
fn repeated_row_in_one_snapshot_is_claimed_once() {
    init_logging();
    let row = donation("Twice", 3_000);
    let decisions = plan_tick(&[row.clone(), row.clone()], &TrackedSet::new(), minimum());
    assert_eq!(decisions, vec![Decision::Claim(row)]);
}

#[test]
fn edited_message_is_a_different_donation() {
    init_logging();
    let original = donation("A", 5_000);
    let mut edited = original.clone();
    edited.message.push_str("\nP.S. go team");
    let tracked = TrackedSet::from_records([original.clone()]);

    let decisions = plan_tick(&[edited.clone()], &tracked, minimum());

    assert_eq!(
        decisions,
        vec![Decision::Retract(original), Decision::Claim(edited)]
    );
}

#[test]
fn empty_snapshot_retracts_everything() {
    init_logging();
    let tracked = TrackedSet::from_records([donation("A", 5_000), donation("B", 6_000)]);
    let decisions = plan_tick(&[], &tracked, minimum());
    assert_eq!(
        decisions,
        vec![
            Decision::Retract(donation("A", 5_000)),
            Decision::Retract(donation("B", 6_000)),
        ]
    );
}
