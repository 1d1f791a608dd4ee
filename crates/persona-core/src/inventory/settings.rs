use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{TraitDefinition, TraitId};

/// Assessment lengths offered to respondents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentMode {
    /// Quick snapshot, roughly ten minutes.
    Demo,
    /// Standard assessment with good reliability.
    Basic,
    /// Full assessment; per-trait targets come from the trait definitions.
    Comprehensive,
}

impl AssessmentMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "demo" | "quick" => Some(Self::Demo),
            "basic" | "standard" => Some(Self::Basic),
            "comprehensive" | "full" => Some(Self::Comprehensive),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Demo => "Quick Demo Test",
            Self::Basic => "Basic Personality Test",
            Self::Comprehensive => "Comprehensive Analysis",
        }
    }

    /// Hard cap on presented items.
    pub const fn max_items(self) -> usize {
        match self {
            Self::Demo => 36,
            Self::Basic => 120,
            Self::Comprehensive => 240,
        }
    }

    /// Items that must be presented before confidence may end the session.
    pub const fn min_items(self) -> usize {
        self.max_items() / 2
    }

    pub const fn per_trait_target(self) -> Option<u32> {
        match self {
            Self::Demo => Some(3),
            Self::Basic => Some(10),
            Self::Comprehensive => None,
        }
    }

    pub fn target_for(self, definition: &TraitDefinition) -> u32 {
        self.per_trait_target()
            .unwrap_or(definition.min_questions)
            .max(1)
    }

    /// Coverage targets for every trait in `traits`.
    pub fn targets(self, traits: &[TraitDefinition]) -> BTreeMap<TraitId, u32> {
        traits
            .iter()
            .map(|definition| (definition.id.clone(), self.target_for(definition)))
            .collect()
    }
}

/// Relative weights of the four selection signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectorWeights {
    pub information: f64,
    pub coverage: f64,
    pub difficulty: f64,
    pub diversity: f64,
}

impl Default for SelectorWeights {
    fn default() -> Self {
        Self {
            information: 0.35,
            coverage: 0.35,
            difficulty: 0.15,
            diversity: 0.15,
        }
    }
}

/// Tunables for selection, scoring, and matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Weight of direct evidence in the displayed score.
    pub direct_weight: f64,
    /// Weight of correlated evidence in the displayed score.
    pub correlated_weight: f64,
    /// Lowest consistency factor a trait's confidence can be scaled by.
    pub confidence_floor: f64,
    /// Mean confidence that ends the session once the soft minimum is met.
    pub confidence_threshold: f64,
    pub selector: SelectorWeights,
    /// How many recent items the diversity signal looks back over.
    pub lookback: usize,
    pub smoothing_min_correlation: f64,
    pub smoothing_tolerance: f64,
    pub smoothing_enforcement: f64,
    pub axis_threshold: f64,
    pub reliability_ceiling: f64,
    /// Per-trait importance used by profile matching; unlisted traits weigh 1.0.
    #[serde(default)]
    pub match_weights: BTreeMap<TraitId, f64>,
    pub display_top: usize,
    /// Share of extreme answers that marks a response style as biased.
    pub extreme_style_ratio: f64,
    pub style_min_answers: usize,
    /// Overrides the mode's item cap, mostly useful for short test catalogs.
    #[serde(default)]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub min_items: Option<usize>,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            direct_weight: 13.0,
            correlated_weight: 1.0,
            confidence_floor: 0.35,
            confidence_threshold: 0.8,
            selector: SelectorWeights::default(),
            lookback: 4,
            smoothing_min_correlation: 0.45,
            smoothing_tolerance: 0.08,
            smoothing_enforcement: 0.22,
            axis_threshold: 0.5,
            reliability_ceiling: 0.95,
            match_weights: BTreeMap::new(),
            display_top: 9,
            extreme_style_ratio: 0.6,
            style_min_answers: 10,
            max_items: None,
            min_items: None,
        }
    }
}

impl AssessmentConfig {
    pub fn validate(&self) -> Result<(), String> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(format!("{name} must be positive, got {value}"))
            }
        };
        let unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(format!("{name} must lie in [0, 1], got {value}"))
            }
        };

        positive("direct_weight", self.direct_weight)?;
        positive("correlated_weight", self.correlated_weight)?;
        unit("confidence_floor", self.confidence_floor)?;
        positive("confidence_threshold", self.confidence_threshold)?;
        unit("confidence_threshold", self.confidence_threshold)?;
        unit("smoothing_min_correlation", self.smoothing_min_correlation)?;
        unit("smoothing_tolerance", self.smoothing_tolerance)?;
        unit("smoothing_enforcement", self.smoothing_enforcement)?;
        unit("axis_threshold", self.axis_threshold)?;
        unit("reliability_ceiling", self.reliability_ceiling)?;
        unit("extreme_style_ratio", self.extreme_style_ratio)?;

        let weights = self.selector;
        for (name, value) in [
            ("selector.information", weights.information),
            ("selector.coverage", weights.coverage),
            ("selector.difficulty", weights.difficulty),
            ("selector.diversity", weights.diversity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be non-negative, got {value}"));
            }
        }

        for (trait_id, weight) in &self.match_weights {
            positive(&format!("match weight for '{trait_id}'"), *weight)?;
        }

        if let (Some(min), Some(max)) = (self.min_items, self.max_items) {
            if min > max {
                return Err(format!("min_items {min} exceeds max_items {max}"));
            }
        }
        if self.max_items == Some(0) {
            return Err("max_items must be at least 1".to_string());
        }

        Ok(())
    }

    pub fn max_items(&self, mode: AssessmentMode) -> usize {
        self.max_items.unwrap_or_else(|| mode.max_items())
    }

    pub fn min_items(&self, mode: AssessmentMode) -> usize {
        let max = self.max_items(mode);
        self.min_items.unwrap_or_else(|| mode.min_items()).min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_carry_their_item_caps() {
        assert_eq!(AssessmentMode::Demo.max_items(), 36);
        assert_eq!(AssessmentMode::Basic.max_items(), 120);
        assert_eq!(AssessmentMode::Comprehensive.max_items(), 240);
        assert_eq!(AssessmentMode::Demo.per_trait_target(), Some(3));
        assert_eq!(AssessmentMode::Comprehensive.per_trait_target(), None);
        assert_eq!(AssessmentMode::parse(" FULL "), Some(AssessmentMode::Comprehensive));
        assert_eq!(AssessmentMode::parse("sprint"), None);
    }

    #[test]
    fn comprehensive_targets_follow_trait_definitions() {
        let definition = TraitDefinition {
            id: TraitId::new("ex"),
            label: "Extraversion".to_string(),
            facets: Vec::new(),
            norm_mean: 0.5,
            norm_sd: 0.15,
            min_questions: 7,
        };
        assert_eq!(AssessmentMode::Comprehensive.target_for(&definition), 7);
        assert_eq!(AssessmentMode::Basic.target_for(&definition), 10);
    }

    #[test]
    fn default_config_validates_and_bad_values_do_not() {
        assert!(AssessmentConfig::default().validate().is_ok());

        let mut config = AssessmentConfig::default();
        config.correlated_weight = 0.0;
        assert!(config.validate().is_err());

        let mut config = AssessmentConfig::default();
        config.min_items = Some(10);
        config.max_items = Some(5);
        assert!(config.validate().is_err());

        let mut config = AssessmentConfig::default();
        config
            .match_weights
            .insert(TraitId::new("ex"), -1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn item_overrides_are_clamped_consistently() {
        let mut config = AssessmentConfig::default();
        config.max_items = Some(6);
        assert_eq!(config.max_items(AssessmentMode::Basic), 6);
        assert_eq!(config.min_items(AssessmentMode::Basic), 6);
        config.min_items = Some(4);
        assert_eq!(config.min_items(AssessmentMode::Basic), 4);
    }
}
