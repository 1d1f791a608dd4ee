//! Live trait estimation and end-of-session scoring.
//!
//! Every answer updates direct evidence for the traits an item loads on and
//! a weaker correlated accumulator for the traits that covary with them.
//! [`ScoringEngine::finalize`] freezes the estimates into a [`FinalReport`].

mod accumulator;
mod finalize;
mod type_code;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::Inventory;
use super::domain::{Item, TraitId};
use super::model::TraitModel;
use super::settings::AssessmentConfig;

pub use accumulator::{EvidenceAccumulator, FacetEvidence, StyleCounts};
pub use finalize::SessionTally;
pub use type_code::{derive_type_code, AxisPole, AxisResult, TypeAxis, TypeCode};

/// Serializable accumulator state for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringState {
    traits: BTreeMap<TraitId, EvidenceAccumulator>,
    #[serde(default)]
    facets: BTreeMap<TraitId, BTreeMap<String, FacetEvidence>>,
    #[serde(default)]
    style: StyleCounts,
}

impl ScoringState {
    pub fn new(model: &TraitModel) -> Self {
        Self {
            traits: model
                .traits()
                .iter()
                .map(|definition| (definition.id.clone(), EvidenceAccumulator::default()))
                .collect(),
            facets: BTreeMap::new(),
            style: StyleCounts::default(),
        }
    }

    pub fn evidence(&self, trait_id: &TraitId) -> Option<&EvidenceAccumulator> {
        self.traits.get(trait_id)
    }

    pub fn facet(&self, trait_id: &TraitId, facet: &str) -> Option<&FacetEvidence> {
        self.facets.get(trait_id).and_then(|facets| facets.get(facet))
    }

    pub fn style(&self) -> StyleCounts {
        self.style
    }

    /// Direct answers recorded for `trait_id`.
    pub fn direct_count(&self, trait_id: &TraitId) -> u32 {
        self.traits
            .get(trait_id)
            .map(EvidenceAccumulator::direct_count)
            .unwrap_or(0)
    }
}

pub struct ScoringEngine<'a> {
    inventory: &'a Inventory,
    config: &'a AssessmentConfig,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(inventory: &'a Inventory, config: &'a AssessmentConfig) -> Self {
        Self { inventory, config }
    }

    /// Fold one validated answer into `state`.
    ///
    /// Cost grows with the number of traits and the item's loadings, never
    /// with the size of the catalog.
    pub fn record(
        &self,
        state: &mut ScoringState,
        item: &Item,
        answer: u8,
        targets: &BTreeMap<TraitId, u32>,
    ) {
        let model = self.inventory.model();
        let matrix = model.correlations();
        let norm = self.inventory.scale().normalize(answer);
        state.style.observe(norm);

        for (position, loading) in item.loadings.iter().enumerate() {
            let Some(index) = model.index_of(&loading.trait_id) else {
                continue;
            };
            let oriented = loading.direction.orient(norm);
            let target = targets.get(&loading.trait_id).copied().unwrap_or(1);

            let evidence = state.traits.entry(loading.trait_id.clone()).or_default();
            evidence.add_direct(oriented, loading.weight);
            evidence.refresh_confidence(target, self.config.confidence_floor);

            if position == 0 {
                if let Some(facet) = &item.facet {
                    state
                        .facets
                        .entry(loading.trait_id.clone())
                        .or_default()
                        .entry(facet.clone())
                        .or_default()
                        .add(oriented, loading.weight);
                }
            }

            for (other, definition) in model.traits().iter().enumerate() {
                if other == index || item.measures(&definition.id) {
                    continue;
                }
                let r = matrix.get(index, other);
                if r == 0.0 {
                    continue;
                }
                state
                    .traits
                    .entry(definition.id.clone())
                    .or_default()
                    .add_correlated(0.5 + (oriented - 0.5) * r, r.abs() * loading.weight);
            }
        }

        debug!(item_id = %item.id, answer, norm, "response scored");
    }

    /// Current blended score for `trait_id`; neutral when nothing is known.
    pub fn live_score(&self, state: &ScoringState, trait_id: &TraitId) -> f64 {
        state
            .traits
            .get(trait_id)
            .map(|evidence| {
                evidence.blended(self.config.direct_weight, self.config.correlated_weight)
            })
            .unwrap_or(0.5)
    }

    pub fn confidence(&self, state: &ScoringState, trait_id: &TraitId) -> f64 {
        state
            .traits
            .get(trait_id)
            .map(EvidenceAccumulator::confidence)
            .unwrap_or(0.0)
    }

    /// Mean confidence across every trait in the model, answered or not.
    pub fn mean_confidence(&self, state: &ScoringState) -> f64 {
        let traits = self.inventory.model().traits();
        if traits.is_empty() {
            return 0.0;
        }
        let total: f64 = traits
            .iter()
            .map(|definition| self.confidence(state, &definition.id))
            .sum();
        total / traits.len() as f64
    }

    pub fn live_scores(&self, state: &ScoringState) -> BTreeMap<TraitId, f64> {
        self.inventory
            .model()
            .traits()
            .iter()
            .map(|definition| {
                (
                    definition.id.clone(),
                    self.live_score(state, &definition.id),
                )
            })
            .collect()
    }
}
