//! Weighted-distance ranking of the reference gallery.
//!
//! Similarity is `max(0, 1 - weighted RMSD)` over the traits both vectors
//! cover. Traits outside the trait model are dropped with a diagnostic
//! rather than treated as zero.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::TraitId;
use super::model::TraitModel;
use super::report::Diagnostic;

/// A fixed comparison target from the gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceProfile {
    pub id: String,
    pub name: String,
    pub scores: BTreeMap<TraitId, f64>,
}

/// Similarity of one reference to the respondent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMatch {
    pub profile_id: String,
    pub name: String,
    pub similarity: f64,
    pub compared_traits: usize,
}

/// Complete ranking, best first. Callers choose their own truncation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    matches: Vec<ProfileMatch>,
}

impl Ranking {
    pub fn all(&self) -> &[ProfileMatch] {
        &self.matches
    }

    pub fn top(&self, n: usize) -> &[ProfileMatch] {
        &self.matches[..n.min(self.matches.len())]
    }

    pub fn best(&self) -> Option<&ProfileMatch> {
        self.matches.first()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Ranking plus any trait mismatches found while computing it.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub ranking: Ranking,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MatcherError {
    #[error("importance weight for trait '{trait_id}' must be positive, got {weight}")]
    InvalidWeight { trait_id: TraitId, weight: f64 },
}

pub struct ProfileMatcher<'a> {
    model: &'a TraitModel,
    weights: &'a BTreeMap<TraitId, f64>,
}

impl<'a> ProfileMatcher<'a> {
    pub fn new(
        model: &'a TraitModel,
        weights: &'a BTreeMap<TraitId, f64>,
    ) -> Result<Self, MatcherError> {
        for (trait_id, weight) in weights {
            if !weight.is_finite() || *weight <= 0.0 {
                return Err(MatcherError::InvalidWeight {
                    trait_id: trait_id.clone(),
                    weight: *weight,
                });
            }
        }
        Ok(Self { model, weights })
    }

    fn weight(&self, trait_id: &TraitId) -> f64 {
        self.weights.get(trait_id).copied().unwrap_or(1.0)
    }

    /// Similarity and the number of traits it was computed over.
    pub fn similarity(
        &self,
        respondent: &BTreeMap<TraitId, f64>,
        reference: &BTreeMap<TraitId, f64>,
    ) -> (f64, usize) {
        let mut weighted_sq = 0.0;
        let mut total_weight = 0.0;
        let mut compared = 0;

        for (trait_id, own) in respondent {
            if !self.model.contains(trait_id) {
                continue;
            }
            let Some(other) = reference.get(trait_id) else {
                continue;
            };
            let weight = self.weight(trait_id);
            let diff = own.clamp(0.0, 1.0) - other.clamp(0.0, 1.0);
            weighted_sq += weight * diff * diff;
            total_weight += weight;
            compared += 1;
        }

        if compared == 0 || total_weight <= 0.0 {
            return (0.0, 0);
        }

        let rmsd = (weighted_sq / total_weight).sqrt();
        ((1.0 - rmsd).clamp(0.0, 1.0), compared)
    }

    pub fn rank(
        &self,
        respondent: &BTreeMap<TraitId, f64>,
        references: &[ReferenceProfile],
    ) -> MatchOutcome {
        let mut reported = BTreeSet::new();
        let mut diagnostics = Vec::new();

        for trait_id in respondent.keys() {
            if !self.model.contains(trait_id) && reported.insert(trait_id.clone()) {
                warn!(trait_id = %trait_id, "respondent score for unknown trait ignored");
                diagnostics.push(Diagnostic::CatalogMismatch {
                    trait_id: trait_id.clone(),
                    context: "respondent scores".to_string(),
                });
            }
        }

        let mut matches = Vec::with_capacity(references.len());
        for profile in references {
            for trait_id in profile.scores.keys() {
                if !self.model.contains(trait_id) && reported.insert(trait_id.clone()) {
                    warn!(
                        profile = %profile.id,
                        trait_id = %trait_id,
                        "reference score for unknown trait ignored"
                    );
                    diagnostics.push(Diagnostic::CatalogMismatch {
                        trait_id: trait_id.clone(),
                        context: format!("reference profile '{}'", profile.id),
                    });
                }
            }

            let (similarity, compared_traits) = self.similarity(respondent, &profile.scores);
            matches.push(ProfileMatch {
                profile_id: profile.id.clone(),
                name: profile.name.clone(),
                similarity,
                compared_traits,
            });
        }

        // `sort_by` is stable, so equal similarities keep gallery order.
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });

        MatchOutcome {
            ranking: Ranking { matches },
            diagnostics,
        }
    }
}
