//! Greedy, single-pass choice of the next item.
//!
//! Each call scores every eligible item on four signals and keeps the best.
//! Nothing is precomputed, so the choice always reflects the latest answers.

pub mod signals;

use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::Inventory;
use super::domain::{Item, ItemId, TraitId};
use super::ledger::ResponseLedger;
use super::report::TerminationReason;
use super::settings::AssessmentConfig;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no eligible item remains for any under-target trait after {presented} item(s)")]
    ExhaustedPool { presented: usize },
}

/// Per-item selection metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemStats {
    pub presentations: u32,
    /// Times the item was an eligible candidate, chosen or not.
    pub considered: u32,
    #[serde(default)]
    pub last_presented: Option<DateTime<Utc>>,
}

/// Everything the selector remembers between calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectorState {
    coverage: BTreeMap<TraitId, u32>,
    stats: BTreeMap<ItemId, ItemStats>,
    recent: VecDeque<ItemId>,
}

impl SelectorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct answers counted toward `trait_id`'s target.
    pub fn coverage(&self, trait_id: &TraitId) -> u32 {
        self.coverage.get(trait_id).copied().unwrap_or(0)
    }

    pub fn coverage_counts(&self) -> &BTreeMap<TraitId, u32> {
        &self.coverage
    }

    pub fn stats(&self, item_id: &ItemId) -> Option<&ItemStats> {
        self.stats.get(item_id)
    }

    pub fn recent(&self) -> impl Iterator<Item = &ItemId> {
        self.recent.iter()
    }

    /// Credit an answered item to every trait it loads on. Skips earn nothing.
    pub(crate) fn note_answered(&mut self, item: &Item) {
        let mut seen = Vec::with_capacity(item.loadings.len());
        for trait_id in item.trait_ids() {
            if !seen.contains(&trait_id) {
                seen.push(trait_id);
                *self.coverage.entry(trait_id.clone()).or_insert(0) += 1;
            }
        }
    }

    pub(crate) fn item_ids(&self) -> impl Iterator<Item = &ItemId> {
        self.stats.keys().chain(self.recent.iter())
    }
}

/// When to stop asking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminationPolicy {
    pub max_items: usize,
    pub min_items: usize,
    pub confidence_threshold: f64,
}

impl TerminationPolicy {
    pub fn should_terminate(
        &self,
        presented: usize,
        mean_confidence: f64,
    ) -> Option<TerminationReason> {
        if presented >= self.max_items {
            Some(TerminationReason::MaxItems)
        } else if presented >= self.min_items && mean_confidence >= self.confidence_threshold {
            Some(TerminationReason::TargetReached)
        } else {
            None
        }
    }
}

pub struct AdaptiveSelector<'a> {
    inventory: &'a Inventory,
    config: &'a AssessmentConfig,
    targets: &'a BTreeMap<TraitId, u32>,
    policy: TerminationPolicy,
    seed: Option<u64>,
}

impl<'a> AdaptiveSelector<'a> {
    pub fn new(
        inventory: &'a Inventory,
        config: &'a AssessmentConfig,
        targets: &'a BTreeMap<TraitId, u32>,
        policy: TerminationPolicy,
        seed: Option<u64>,
    ) -> Self {
        Self {
            inventory,
            config,
            targets,
            policy,
            seed,
        }
    }

    fn under_target(&self, state: &SelectorState, trait_id: &TraitId) -> bool {
        self.targets
            .get(trait_id)
            .is_some_and(|target| state.coverage(trait_id) < *target)
    }

    /// Items never shown that still help an under-target trait, with their
    /// catalog positions.
    fn candidates(
        &self,
        state: &SelectorState,
        ledger: &ResponseLedger,
        pending: Option<&ItemId>,
    ) -> Vec<(usize, &'a Item)> {
        self.inventory
            .items()
            .items()
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                pending != Some(&item.id)
                    && !ledger.contains(&item.id)
                    && item
                        .trait_ids()
                        .any(|trait_id| self.under_target(state, trait_id))
            })
            .collect()
    }

    /// Catalog position to tie-break rank. Identity without a seed.
    fn tie_ranks(&self) -> Vec<usize> {
        let len = self.inventory.items().len();
        let mut order: Vec<usize> = (0..len).collect();
        if let Some(seed) = self.seed {
            let mut rng = StdRng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }
        let mut ranks = vec![0; len];
        for (rank, position) in order.into_iter().enumerate() {
            ranks[position] = rank;
        }
        ranks
    }

    /// Choose and mark the next item.
    pub fn select(
        &self,
        state: &mut SelectorState,
        ledger: &ResponseLedger,
        pending: Option<&ItemId>,
        confidence: &BTreeMap<TraitId, f64>,
        now: DateTime<Utc>,
    ) -> Result<ItemId, SelectionError> {
        let weights = self.config.selector;
        let presented = ledger.len();
        let max_items = self.policy.max_items.max(1);
        let progress = presented as f64 / max_items as f64;
        let recent: Vec<&Item> = state
            .recent
            .iter()
            .filter_map(|id| self.inventory.items().get(id))
            .collect();
        let ranks = self.tie_ranks();

        let mut best: Option<(f64, u32, usize, &Item)> = None;
        let mut considered = Vec::new();
        for (position, item) in self.candidates(state, ledger, pending) {
            let score = weights.information * signals::information_value(item, confidence)
                + weights.coverage
                    * signals::coverage_need(item, &state.coverage, self.targets)
                + weights.difficulty * signals::difficulty_fit(item, progress)
                + weights.diversity * signals::diversity_bonus(item, &recent);
            let times = state.stats.get(&item.id).map(|s| s.considered).unwrap_or(0);
            let rank = ranks[position];
            considered.push(item.id.clone());

            let better = match &best {
                None => true,
                Some((best_score, best_times, best_rank, _)) => {
                    match score.partial_cmp(best_score).unwrap_or(Ordering::Equal) {
                        Ordering::Greater => true,
                        Ordering::Less => false,
                        Ordering::Equal => (times, rank) < (*best_times, *best_rank),
                    }
                }
            };
            if better {
                best = Some((score, times, rank, item));
            }
        }

        let Some((score, _, _, chosen)) = best else {
            return Err(SelectionError::ExhaustedPool { presented });
        };

        for item_id in considered {
            state.stats.entry(item_id).or_default().considered += 1;
        }
        let stats = state.stats.entry(chosen.id.clone()).or_default();
        stats.presentations += 1;
        stats.last_presented = Some(now);

        state.recent.push_back(chosen.id.clone());
        while state.recent.len() > self.config.lookback {
            state.recent.pop_front();
        }

        debug!(item_id = %chosen.id, score, presented, "item selected");
        Ok(chosen.id.clone())
    }
}
