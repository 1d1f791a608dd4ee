use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for inventory items.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for traits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitId(pub String);

impl TraitId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for assessment sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Fresh random (v4) id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether agreeing with an item raises or lowers the trait it loads on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    /// Apply the keying to an answer already normalized to `[0, 1]`.
    pub fn orient(self, normalized: f64) -> f64 {
        match self {
            Direction::Positive => normalized,
            Direction::Negative => 1.0 - normalized,
        }
    }
}

/// One item-to-trait association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitLoading {
    pub trait_id: TraitId,
    pub weight: f64,
    pub direction: Direction,
}

/// A single inventory question. Immutable once the catalog is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub text: String,
    pub loadings: Vec<TraitLoading>,
    #[serde(default)]
    pub facet: Option<String>,
    pub difficulty: f64,
    pub discriminability: f64,
    pub category: String,
}

impl Item {
    /// The first loading is the trait the item was written for; facets belong to it.
    pub fn primary_trait(&self) -> Option<&TraitId> {
        self.loadings.first().map(|loading| &loading.trait_id)
    }

    pub fn measures(&self, trait_id: &TraitId) -> bool {
        self.loadings
            .iter()
            .any(|loading| &loading.trait_id == trait_id)
    }

    pub fn trait_ids(&self) -> impl Iterator<Item = &TraitId> {
        self.loadings.iter().map(|loading| &loading.trait_id)
    }
}

/// A continuous personality dimension and its norms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitDefinition {
    pub id: TraitId,
    pub label: String,
    #[serde(default)]
    pub facets: Vec<String>,
    #[serde(default = "default_norm_mean")]
    pub norm_mean: f64,
    #[serde(default = "default_norm_sd")]
    pub norm_sd: f64,
    #[serde(default = "default_min_questions")]
    pub min_questions: u32,
}

fn default_norm_mean() -> f64 {
    0.5
}

fn default_norm_sd() -> f64 {
    0.15
}

fn default_min_questions() -> u32 {
    3
}

/// Bounded integer Likert scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerScale {
    pub min: u8,
    pub max: u8,
}

impl Default for AnswerScale {
    fn default() -> Self {
        Self { min: 1, max: 5 }
    }
}

impl AnswerScale {
    pub fn contains(&self, answer: u8) -> bool {
        (self.min..=self.max).contains(&answer)
    }

    /// Map an answer onto `[0, 1]`. Callers check `contains` first.
    pub fn normalize(&self, answer: u8) -> f64 {
        let span = f64::from(self.max - self.min);
        if span <= 0.0 {
            return 0.5;
        }
        ((f64::from(answer) - f64::from(self.min)) / span).clamp(0.0, 1.0)
    }

    pub fn midpoint(&self) -> f64 {
        (f64::from(self.min) + f64::from(self.max)) / 2.0
    }
}

/// One ledger entry. `answer == None` is the explicit skip marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub item_id: ItemId,
    pub answer: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    pub recorded_at: DateTime<Utc>,
}

impl Response {
    pub fn is_skip(&self) -> bool {
        self.answer.is_none()
    }
}
