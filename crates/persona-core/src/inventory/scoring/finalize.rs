use std::collections::BTreeMap;

use tracing::{info, warn};

use super::type_code::derive_type_code;
use super::{ScoringEngine, ScoringState};
use crate::inventory::domain::{TraitDefinition, TraitId};
use crate::inventory::matcher::{ProfileMatcher, Ranking};
use crate::inventory::report::{
    Diagnostic, FinalReport, ResponseStyle, ResultQuality, SmoothingAdjustment, TerminationReason,
    TraitScore,
};

/// Ledger-level facts the scoring state does not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTally {
    pub termination: TerminationReason,
    pub answered: usize,
    pub skipped: usize,
    pub max_items: usize,
}

impl ScoringEngine<'_> {
    /// Freeze `state` into a report. Pure: the same inputs give the same report.
    pub fn finalize(
        &self,
        state: &ScoringState,
        tally: SessionTally,
        carried: Vec<Diagnostic>,
    ) -> FinalReport {
        let model = self.inventory.model();
        let definitions = model.traits();
        let mut diagnostics = carried;
        let degenerate = tally.answered == 0;

        let mut scores: Vec<f64> = definitions
            .iter()
            .map(|definition| {
                if degenerate {
                    0.5
                } else {
                    self.live_score(state, &definition.id)
                }
            })
            .collect();
        let confidences: Vec<f64> = definitions
            .iter()
            .map(|definition| self.confidence(state, &definition.id))
            .collect();

        let adjustments = if degenerate {
            warn!(
                skipped = tally.skipped,
                "finalizing without any answers; reporting neutral scores"
            );
            diagnostics.push(Diagnostic::DegenerateFinalization {
                answered: tally.answered,
            });
            Vec::new()
        } else {
            self.smooth(definitions, &mut scores, &confidences)
        };

        let traits: Vec<TraitScore> = definitions
            .iter()
            .zip(scores.iter().zip(confidences.iter()))
            .map(|(definition, (&score, &confidence))| {
                self.trait_score(state, definition, score, confidence)
            })
            .collect();

        let vector: BTreeMap<TraitId, f64> = traits
            .iter()
            .map(|score| (score.trait_id.clone(), score.score))
            .collect();

        let (type_code, axis_diagnostics) = derive_type_code(
            self.inventory.axes(),
            model,
            &vector,
            self.config.axis_threshold,
        );
        diagnostics.extend(axis_diagnostics);

        let matches = match ProfileMatcher::new(model, &self.config.match_weights) {
            Ok(matcher) => {
                let outcome = matcher.rank(&vector, self.inventory.references());
                diagnostics.extend(outcome.diagnostics);
                outcome.ranking
            }
            Err(err) => {
                warn!(error = %err, "profile matching skipped");
                Ranking::default()
            }
        };

        let style = self.response_style(state);
        if self.is_extreme(state, &style) {
            warn!(
                high_ratio = style.high_ratio,
                low_ratio = style.low_ratio,
                "extreme response style detected"
            );
            diagnostics.push(Diagnostic::ExtremeResponding {
                high_ratio: style.high_ratio,
                low_ratio: style.low_ratio,
            });
        }

        let mean_confidence = if definitions.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f64>() / definitions.len() as f64
        };
        let reliability = self.reliability(state, &tally);
        let quality = self.quality(&tally, mean_confidence, &diagnostics);

        info!(
            termination = tally.termination.label(),
            answered = tally.answered,
            type_code = %type_code.code,
            reliability,
            ?quality,
            "assessment finalized"
        );

        FinalReport {
            termination: tally.termination,
            quality,
            answered: tally.answered,
            skipped: tally.skipped,
            traits,
            type_code,
            matches,
            reliability,
            mean_confidence,
            style,
            adjustments,
            diagnostics,
        }
    }

    /// One corrective pass over strongly correlated pairs that ended up on
    /// the wrong sides of neutral. Only the less confident trait moves, and
    /// never closer to neutral than the tolerance.
    fn smooth(
        &self,
        definitions: &[TraitDefinition],
        scores: &mut [f64],
        confidences: &[f64],
    ) -> Vec<SmoothingAdjustment> {
        let tolerance = self.config.smoothing_tolerance;
        let enforcement = self.config.smoothing_enforcement;
        let mut adjustments = Vec::new();

        for (i, j, r) in self
            .inventory
            .model()
            .correlations()
            .strong_pairs(self.config.smoothing_min_correlation)
        {
            let (di, dj) = (scores[i] - 0.5, scores[j] - 0.5);
            let expected_same_side = r > 0.0;
            let same_side = di * dj > 0.0;
            if same_side == expected_same_side || di.abs().min(dj.abs()) <= tolerance {
                continue;
            }

            let (moved, partner) = if confidences[i] < confidences[j] {
                (i, j)
            } else {
                (j, i)
            };
            let deviation = scores[moved] - 0.5;
            let shrunk = (deviation.abs() * (1.0 - enforcement * r.abs())).max(tolerance);
            let after = (0.5 + shrunk.copysign(deviation)).clamp(0.0, 1.0);

            adjustments.push(SmoothingAdjustment {
                trait_id: definitions[moved].id.clone(),
                partner: definitions[partner].id.clone(),
                correlation: r,
                before: scores[moved],
                after,
            });
            scores[moved] = after;
        }

        adjustments
    }

    fn trait_score(
        &self,
        state: &ScoringState,
        definition: &TraitDefinition,
        score: f64,
        confidence: f64,
    ) -> TraitScore {
        let evidence = state.evidence(&definition.id);

        // Declared facets first, then any facet only the items mention.
        let mut facets: BTreeMap<String, f64> = definition
            .facets
            .iter()
            .map(|facet| (facet.clone(), score))
            .collect();
        if let Some(observed) = state.facets.get(&definition.id) {
            for (facet, evidence) in observed {
                if let Some(mean) = evidence.mean() {
                    facets.insert(facet.clone(), mean);
                }
            }
        }

        let t_score = if definition.norm_sd > 0.0 {
            50.0 + 10.0 * (score - definition.norm_mean) / definition.norm_sd
        } else {
            50.0
        };

        TraitScore {
            trait_id: definition.id.clone(),
            label: definition.label.clone(),
            score,
            t_score,
            raw: evidence.and_then(|evidence| evidence.direct_mean()),
            responses: evidence.map(|evidence| evidence.direct_count()).unwrap_or(0),
            confidence,
            facets,
        }
    }

    fn response_style(&self, state: &ScoringState) -> ResponseStyle {
        let counts = state.style();
        let total = counts.total();
        if total == 0 {
            return ResponseStyle::default();
        }
        let total = f64::from(total);
        ResponseStyle {
            high_ratio: f64::from(counts.high) / total,
            low_ratio: f64::from(counts.low) / total,
            moderate_ratio: f64::from(counts.moderate) / total,
        }
    }

    fn is_extreme(&self, state: &ScoringState, style: &ResponseStyle) -> bool {
        state.style().total() as usize >= self.config.style_min_answers
            && (style.high_ratio > self.config.extreme_style_ratio
                || style.low_ratio > self.config.extreme_style_ratio)
    }

    /// Completion against what the session could have asked, averaged with
    /// the share of traits that saw a direct answer, then capped.
    fn reliability(&self, state: &ScoringState, tally: &SessionTally) -> f64 {
        let definitions = self.inventory.model().traits();
        if tally.answered == 0 || definitions.is_empty() {
            return 0.0;
        }

        let reachable = tally.max_items.min(self.inventory.items().len()).max(1);
        let completion = (tally.answered as f64 / reachable as f64).min(1.0);
        let covered = definitions
            .iter()
            .filter(|definition| state.direct_count(&definition.id) > 0)
            .count();
        let breadth = covered as f64 / definitions.len() as f64;

        (self.config.reliability_ceiling * (completion + breadth) / 2.0).clamp(0.0, 1.0)
    }

    fn quality(
        &self,
        tally: &SessionTally,
        mean_confidence: f64,
        diagnostics: &[Diagnostic],
    ) -> ResultQuality {
        if tally.answered == 0 {
            return ResultQuality::Degenerate;
        }
        if tally.answered < self.inventory.model().len() {
            return ResultQuality::LowReliability;
        }
        let cut_short = matches!(
            tally.termination,
            TerminationReason::EarlyExit | TerminationReason::ExhaustedPool
        );
        let flagged = diagnostics.iter().any(|diagnostic| {
            matches!(
                diagnostic,
                Diagnostic::ExtremeResponding { .. } | Diagnostic::CatalogMismatch { .. }
            )
        });
        if cut_short || flagged || mean_confidence < self.config.confidence_threshold {
            ResultQuality::Partial
        } else {
            ResultQuality::Complete
        }
    }
}
