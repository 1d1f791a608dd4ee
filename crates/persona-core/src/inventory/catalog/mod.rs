//! Item catalog, trait model, reference gallery and type-axis configuration.
//!
//! Everything here is validated once at construction and is read-only
//! afterwards, so an [`Inventory`] can be shared between sessions via `Arc`.

mod builtin;
mod loader;

pub use loader::CatalogLoader;

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::domain::{AnswerScale, Item, ItemId, TraitDefinition, TraitId};
use super::matcher::ReferenceProfile;
use super::model::{CorrelationPair, TraitModel};
use super::scoring::TypeAxis;

/// Ordered, id-indexed collection of items.
#[derive(Debug, Clone)]
pub struct ItemCatalog {
    items: Vec<Item>,
    index: BTreeMap<ItemId, usize>,
}

impl ItemCatalog {
    fn new(items: Vec<Item>) -> Self {
        let index = items
            .iter()
            .enumerate()
            .map(|(position, item)| (item.id.clone(), position))
            .collect();
        Self { items, index }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.position(id).map(|position| &self.items[position])
    }

    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Number of items loading on each trait.
    pub fn items_per_trait(&self) -> BTreeMap<TraitId, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            for trait_id in item.trait_ids().collect::<BTreeSet<_>>() {
                *counts.entry(trait_id.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// The complete static data set one assessment runs against.
#[derive(Debug, Clone)]
pub struct Inventory {
    scale: AnswerScale,
    model: TraitModel,
    items: ItemCatalog,
    references: Vec<ReferenceProfile>,
    axes: Vec<TypeAxis>,
}

impl Inventory {
    pub fn new(
        scale: AnswerScale,
        traits: Vec<TraitDefinition>,
        correlations: Vec<CorrelationPair>,
        items: Vec<Item>,
        references: Vec<ReferenceProfile>,
        axes: Vec<TypeAxis>,
    ) -> Result<Self, CatalogError> {
        validate_scale(scale)?;
        validate_traits(&traits)?;
        let model = TraitModel::new(traits, correlations);
        validate_items(&items, &model)?;
        validate_references(&references, &model)?;
        validate_axes(&axes, &model)?;

        Ok(Self {
            scale,
            model,
            items: ItemCatalog::new(items),
            references,
            axes,
        })
    }

    /// The smaller catalog compiled into the crate.
    pub fn builtin() -> Self {
        builtin::inventory()
    }

    /// Same traits, gallery and axes, different item pool.
    pub fn with_items(&self, items: Vec<Item>) -> Result<Self, CatalogError> {
        Self::new(
            self.scale,
            self.model.traits().to_vec(),
            self.model.pairs().to_vec(),
            items,
            self.references.clone(),
            self.axes.clone(),
        )
    }

    pub fn scale(&self) -> AnswerScale {
        self.scale
    }

    pub fn model(&self) -> &TraitModel {
        &self.model
    }

    pub fn items(&self) -> &ItemCatalog {
        &self.items
    }

    pub fn references(&self) -> &[ReferenceProfile] {
        &self.references
    }

    pub fn axes(&self) -> &[TypeAxis] {
        &self.axes
    }
}

/// Structural problems in catalog data. These fail the load.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid item CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("answer scale {min}..={max} must span at least two values")]
    InvalidScale { min: u8, max: u8 },
    #[error("catalog defines no traits")]
    NoTraits,
    #[error("catalog defines no items")]
    NoItems,
    #[error("trait '{0}' is defined more than once")]
    DuplicateTrait(TraitId),
    #[error("trait '{trait_id}' is invalid: {reason}")]
    InvalidTrait { trait_id: TraitId, reason: String },
    #[error("item '{0}' is defined more than once")]
    DuplicateItem(ItemId),
    #[error("item '{item_id}' is invalid: {reason}")]
    InvalidItem { item_id: ItemId, reason: String },
    #[error("item '{item_id}' loads on unknown trait '{trait_id}'")]
    UnknownTrait { item_id: ItemId, trait_id: TraitId },
    #[error("reference profile '{profile_id}' is invalid: {reason}")]
    InvalidProfile { profile_id: String, reason: String },
    #[error("type axis '{axis}' is invalid: {reason}")]
    InvalidAxis { axis: String, reason: String },
}

fn validate_scale(scale: AnswerScale) -> Result<(), CatalogError> {
    if scale.max <= scale.min {
        return Err(CatalogError::InvalidScale {
            min: scale.min,
            max: scale.max,
        });
    }
    Ok(())
}

fn validate_traits(traits: &[TraitDefinition]) -> Result<(), CatalogError> {
    if traits.is_empty() {
        return Err(CatalogError::NoTraits);
    }

    let mut seen = BTreeSet::new();
    for definition in traits {
        if !seen.insert(&definition.id) {
            return Err(CatalogError::DuplicateTrait(definition.id.clone()));
        }
        if !definition.norm_sd.is_finite() || definition.norm_sd <= 0.0 {
            return Err(CatalogError::InvalidTrait {
                trait_id: definition.id.clone(),
                reason: format!("norm_sd {} must be positive", definition.norm_sd),
            });
        }
        if !definition.norm_mean.is_finite() {
            return Err(CatalogError::InvalidTrait {
                trait_id: definition.id.clone(),
                reason: "norm_mean must be finite".to_string(),
            });
        }
        if definition.min_questions == 0 {
            return Err(CatalogError::InvalidTrait {
                trait_id: definition.id.clone(),
                reason: "min_questions must be at least 1".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_items(items: &[Item], model: &TraitModel) -> Result<(), CatalogError> {
    if items.is_empty() {
        return Err(CatalogError::NoItems);
    }

    let mut seen = BTreeSet::new();
    for item in items {
        if !seen.insert(&item.id) {
            return Err(CatalogError::DuplicateItem(item.id.clone()));
        }
        let invalid = |reason: String| CatalogError::InvalidItem {
            item_id: item.id.clone(),
            reason,
        };

        if item.loadings.is_empty() {
            return Err(invalid("item must load on at least one trait".to_string()));
        }
        if !(0.0..=1.0).contains(&item.difficulty) {
            return Err(invalid(format!(
                "difficulty {} outside [0, 1]",
                item.difficulty
            )));
        }
        if !(0.0..=1.0).contains(&item.discriminability) {
            return Err(invalid(format!(
                "discriminability {} outside [0, 1]",
                item.discriminability
            )));
        }

        let mut loaded = BTreeSet::new();
        for loading in &item.loadings {
            if !model.contains(&loading.trait_id) {
                return Err(CatalogError::UnknownTrait {
                    item_id: item.id.clone(),
                    trait_id: loading.trait_id.clone(),
                });
            }
            if !loading.weight.is_finite() || loading.weight <= 0.0 {
                return Err(invalid(format!(
                    "weight {} for trait '{}' must be positive",
                    loading.weight, loading.trait_id
                )));
            }
            if !loaded.insert(&loading.trait_id) {
                return Err(invalid(format!(
                    "trait '{}' loaded more than once",
                    loading.trait_id
                )));
            }
        }

        if let (Some(facet), Some(primary)) = (&item.facet, item.primary_trait()) {
            let declared = model
                .definition(primary)
                .map(|definition| definition.facets.iter().any(|known| known == facet))
                .unwrap_or(false);
            if !declared {
                return Err(invalid(format!(
                    "facet '{}' is not declared on trait '{}'",
                    facet, primary
                )));
            }
        }
    }
    Ok(())
}

fn validate_references(
    references: &[ReferenceProfile],
    model: &TraitModel,
) -> Result<(), CatalogError> {
    let mut seen = BTreeSet::new();
    for profile in references {
        if !seen.insert(&profile.id) {
            return Err(CatalogError::InvalidProfile {
                profile_id: profile.id.clone(),
                reason: "duplicate profile id".to_string(),
            });
        }
        for (trait_id, score) in &profile.scores {
            if !(0.0..=1.0).contains(score) {
                return Err(CatalogError::InvalidProfile {
                    profile_id: profile.id.clone(),
                    reason: format!("score {} for '{}' outside [0, 1]", score, trait_id),
                });
            }
            if !model.contains(trait_id) {
                warn!(
                    profile = %profile.id,
                    trait_id = %trait_id,
                    "reference profile names a trait outside the model; ignored when matching"
                );
            }
        }
    }
    Ok(())
}

fn validate_axes(axes: &[TypeAxis], model: &TraitModel) -> Result<(), CatalogError> {
    for axis in axes {
        if axis.poles.is_empty() {
            return Err(CatalogError::InvalidAxis {
                axis: axis.name.clone(),
                reason: "axis needs at least one trait pole".to_string(),
            });
        }
        if axis.high == axis.low {
            return Err(CatalogError::InvalidAxis {
                axis: axis.name.clone(),
                reason: "high and low letters must differ".to_string(),
            });
        }
        for pole in &axis.poles {
            if !pole.weight.is_finite() || pole.weight <= 0.0 {
                return Err(CatalogError::InvalidAxis {
                    axis: axis.name.clone(),
                    reason: format!("weight for '{}' must be positive", pole.trait_id),
                });
            }
            if !model.contains(&pole.trait_id) {
                warn!(
                    axis = %axis.name,
                    trait_id = %pole.trait_id,
                    "type axis names a trait outside the model; it will be ignored"
                );
            }
        }
        if !axis.poles.iter().any(|pole| model.contains(&pole.trait_id)) {
            return Err(CatalogError::InvalidAxis {
                axis: axis.name.clone(),
                reason: "no pole names a trait in the model".to_string(),
            });
        }
    }
    Ok(())
}
