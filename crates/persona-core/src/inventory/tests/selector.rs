use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;

use super::common::*;
use crate::inventory::catalog::Inventory;
use crate::inventory::domain::{AnswerScale, Item, ItemId, TraitId};
use crate::inventory::ledger::ResponseLedger;
use crate::inventory::report::{Diagnostic, ResultQuality, TerminationReason};
use crate::inventory::selector::{
    AdaptiveSelector, SelectionError, SelectorState, TerminationPolicy,
};
use crate::inventory::session::{AssessmentError, NextItem, SessionStatus};
use crate::inventory::settings::{AssessmentConfig, AssessmentMode};

fn ids(ids: &[ItemId]) -> Vec<&str> {
    ids.iter().map(ItemId::as_str).collect()
}

/// Trait `x` asks for three answers but only has two items; `y` wants two.
fn short_pool_inventory() -> Inventory {
    Inventory::new(
        AnswerScale::default(),
        vec![trait_def("x", 3), trait_def("y", 2)],
        Vec::new(),
        vec![
            item("x1", "x", "xs"),
            item("x2", "x", "xs"),
            item("y1", "y", "ys"),
            item("y2", "y", "ys"),
        ],
        Vec::new(),
        Vec::new(),
    )
    .expect("fixture inventory is valid")
}

#[test]
fn never_re_presents_an_item_from_the_ledger() {
    let inventory = Inventory::builtin();
    let mut session = crate::inventory::session::Session::start(
        crate::inventory::domain::SessionId::new("builtin"),
        &inventory,
        AssessmentMode::Demo,
        Some(99),
        AssessmentConfig::default(),
    )
    .expect("session starts");

    let answer = |item: &Item| (item.text.len() % 5) as u8 + 1;
    let (presented, _) = drive(&mut session, &inventory, answer, 100);
    let unique: BTreeSet<_> = presented.iter().collect();
    assert_eq!(unique.len(), presented.len());
    assert!(!presented.is_empty());

    let ledger_ids: BTreeSet<_> = session
        .ledger()
        .entries()
        .iter()
        .map(|response| &response.item_id)
        .collect();
    assert_eq!(ledger_ids.len(), session.ledger().len());
}

#[test]
fn exhausted_pool_fires_only_when_no_item_serves_an_under_target_trait() {
    let inventory = short_pool_inventory();
    let mut session = start(&inventory, fixed_length(10), None);

    let (presented, stop) = drive(&mut session, &inventory, |_| 4, 10);
    assert_eq!(presented.len(), 4, "every item is served before the pool runs dry");
    assert_eq!(stop, Stop::Exhausted);
    assert_eq!(session.termination(), Some(TerminationReason::ExhaustedPool));
    assert_eq!(session.selector_state().coverage(&TraitId::new("x")), 2);

    // Still surfaced until the caller finalizes.
    assert!(matches!(
        session.next_item(&inventory),
        Err(AssessmentError::ExhaustedPool { presented: 4 })
    ));

    let report = session.finalize(&inventory).clone();
    assert_eq!(report.termination, TerminationReason::ExhaustedPool);
    assert_eq!(report.quality, ResultQuality::Partial);
    assert!(report
        .diagnostics
        .contains(&Diagnostic::ExhaustedPool { presented: 4 }));
    assert_eq!(session.status(), SessionStatus::Finalized);
    assert!(matches!(
        session.next_item(&inventory),
        Ok(NextItem::Complete(TerminationReason::ExhaustedPool))
    ));
}

#[test]
fn selector_reports_exhaustion_once_targets_are_met() {
    let inventory = short_pool_inventory();
    let config = fixed_length(10);
    let targets = BTreeMap::from([(TraitId::new("x"), 1), (TraitId::new("y"), 1)]);
    let policy = TerminationPolicy {
        max_items: 10,
        min_items: 10,
        confidence_threshold: 0.8,
    };
    let selector = AdaptiveSelector::new(&inventory, &config, &targets, policy, None);
    let mut state = SelectorState::new();
    let ledger = ResponseLedger::new();
    let confidence = BTreeMap::new();

    for id in ["x1", "y1"] {
        state.note_answered(&item_of(&inventory, id));
    }
    assert_eq!(
        selector.select(&mut state, &ledger, None, &confidence, Utc::now()),
        Err(SelectionError::ExhaustedPool { presented: 0 })
    );
}

#[test]
fn unseeded_ties_fall_back_to_catalog_order() {
    let inventory = three_trait_inventory();
    let mut session = start(&inventory, fixed_length(6), None);
    let (presented, _) = drive(&mut session, &inventory, |_| 3, 1);
    assert_eq!(ids(&presented), vec!["a1"]);
}

#[test]
fn same_seed_gives_the_same_sequence() {
    let inventory = Inventory::builtin();
    let run = |seed| {
        let mut session = crate::inventory::session::Session::start(
            crate::inventory::domain::SessionId::new("seeded"),
            &inventory,
            AssessmentMode::Demo,
            Some(seed),
            AssessmentConfig::default(),
        )
        .expect("session starts");
        drive(&mut session, &inventory, |_| 3, 100).0
    };
    assert_eq!(run(7), run(7));
}

#[test]
fn next_pick_moves_to_an_uncovered_trait() {
    let inventory = three_trait_inventory();
    let mut session = start(&inventory, fixed_length(6), None);
    let (presented, _) = drive(&mut session, &inventory, |_| 5, 3);

    let traits: BTreeSet<_> = presented
        .iter()
        .map(|id| item_of(&inventory, id.as_str()).loadings[0].trait_id.clone())
        .collect();
    assert_eq!(traits.len(), 3, "first three picks cover three traits: {presented:?}");
}

#[test]
fn selection_updates_item_metadata() {
    let inventory = three_trait_inventory();
    let config = AssessmentConfig::default();
    let targets = AssessmentMode::Comprehensive.targets(inventory.model().traits());
    let policy = TerminationPolicy {
        max_items: 6,
        min_items: 6,
        confidence_threshold: 0.8,
    };
    let selector = AdaptiveSelector::new(&inventory, &config, &targets, policy, None);
    let mut state = SelectorState::new();
    let ledger = ResponseLedger::new();

    let chosen = selector
        .select(&mut state, &ledger, None, &BTreeMap::new(), Utc::now())
        .expect("fresh catalog has candidates");

    let stats = state.stats(&chosen).expect("chosen item has stats");
    assert_eq!(stats.presentations, 1);
    assert!(stats.last_presented.is_some());
    for item in inventory.items().items() {
        assert_eq!(state.stats(&item.id).map(|s| s.considered), Some(1));
    }
    assert_eq!(state.recent().collect::<Vec<_>>(), vec![&chosen]);

    // A pending item is never offered twice.
    let again = selector
        .select(&mut state, &ledger, Some(&chosen), &BTreeMap::new(), Utc::now())
        .expect("other candidates remain");
    assert_ne!(again, chosen);
}

#[test]
fn skipped_items_earn_no_coverage_and_are_not_repeated() {
    let inventory = three_trait_inventory();
    let mut session = start(&inventory, fixed_length(6), None);

    let first = match session.next_item(&inventory) {
        Ok(NextItem::Present(item)) => item.id.clone(),
        other => panic!("expected an item, got {other:?}"),
    };
    session.skip(&inventory, &first).expect("pending item can be skipped");
    assert_eq!(session.ledger().skipped(), 1);
    assert_eq!(session.selector_state().coverage(&TraitId::new("a")), 0);

    let (presented, _) = drive(&mut session, &inventory, |_| 3, 10);
    assert!(!presented.contains(&first));
}

#[test]
fn termination_policy_checks_cap_then_confidence() {
    let policy = TerminationPolicy {
        max_items: 10,
        min_items: 5,
        confidence_threshold: 0.8,
    };
    assert_eq!(policy.should_terminate(4, 1.0), None);
    assert_eq!(policy.should_terminate(5, 0.79), None);
    assert_eq!(
        policy.should_terminate(5, 0.8),
        Some(TerminationReason::TargetReached)
    );
    assert_eq!(
        policy.should_terminate(10, 0.1),
        Some(TerminationReason::MaxItems)
    );
}
