use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::TraitId;
use super::matcher::Ranking;
use super::scoring::TypeCode;

/// Why the session stopped presenting items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Soft minimum reached and mean confidence met the threshold.
    TargetReached,
    /// Hard item cap reached.
    MaxItems,
    /// No eligible item left for any under-target trait.
    ExhaustedPool,
    /// The caller ended the session early.
    EarlyExit,
}

impl TerminationReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::TargetReached => "target_reached",
            Self::MaxItems => "max_items",
            Self::ExhaustedPool => "exhausted_pool",
            Self::EarlyExit => "early_exit",
        }
    }
}

/// How much trust a final result deserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultQuality {
    /// Ended normally with mean confidence at or above the threshold.
    Complete,
    /// Usable, but ended early or below the confidence threshold.
    Partial,
    /// Fewer answers than traits; treat scores as rough.
    LowReliability,
    /// No answers at all; scores are neutral placeholders.
    Degenerate,
}

impl ResultQuality {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::LowReliability => "low_reliability",
            Self::Degenerate => "degenerate",
        }
    }
}

/// Non-fatal conditions attached to a result so it is never mistaken for a clean one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    DegenerateFinalization { answered: usize },
    ExhaustedPool { presented: usize },
    CatalogMismatch { trait_id: TraitId, context: String },
    ExtremeResponding { high_ratio: f64, low_ratio: f64 },
}

impl Diagnostic {
    pub fn summary(&self) -> String {
        match self {
            Diagnostic::DegenerateFinalization { answered } => {
                format!("finalized with {answered} answer(s); scores are neutral placeholders")
            }
            Diagnostic::ExhaustedPool { presented } => {
                format!("item pool exhausted after {presented} item(s)")
            }
            Diagnostic::CatalogMismatch { trait_id, context } => {
                format!("trait '{trait_id}' is not in the trait model ({context}); excluded")
            }
            Diagnostic::ExtremeResponding {
                high_ratio,
                low_ratio,
            } => format!(
                "extreme response style ({:.0}% high, {:.0}% low); interpret with care",
                high_ratio * 100.0,
                low_ratio * 100.0
            ),
        }
    }
}

/// Share of high, low and middling answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseStyle {
    pub high_ratio: f64,
    pub low_ratio: f64,
    pub moderate_ratio: f64,
}

/// Final per-trait result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitScore {
    pub trait_id: TraitId,
    pub label: String,
    pub score: f64,
    pub t_score: f64,
    /// Weighted mean of direct evidence before blending and smoothing.
    pub raw: Option<f64>,
    pub responses: u32,
    pub confidence: f64,
    pub facets: BTreeMap<String, f64>,
}

/// One corrective move made by the finalization smoothing pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingAdjustment {
    pub trait_id: TraitId,
    pub partner: TraitId,
    pub correlation: f64,
    pub before: f64,
    pub after: f64,
}

/// Everything a presentation layer needs once the session has terminated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub termination: TerminationReason,
    pub quality: ResultQuality,
    pub answered: usize,
    pub skipped: usize,
    pub traits: Vec<TraitScore>,
    pub type_code: TypeCode,
    pub matches: Ranking,
    pub reliability: f64,
    pub mean_confidence: f64,
    pub style: ResponseStyle,
    pub adjustments: Vec<SmoothingAdjustment>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FinalReport {
    pub fn trait_score(&self, trait_id: &TraitId) -> Option<&TraitScore> {
        self.traits.iter().find(|score| &score.trait_id == trait_id)
    }

    /// Trait id to final score, the vector profile matching runs on.
    pub fn score_vector(&self) -> BTreeMap<TraitId, f64> {
        self.traits
            .iter()
            .map(|score| (score.trait_id.clone(), score.score))
            .collect()
    }

    pub fn is_low_quality(&self) -> bool {
        matches!(
            self.quality,
            ResultQuality::LowReliability | ResultQuality::Degenerate
        )
    }
}
