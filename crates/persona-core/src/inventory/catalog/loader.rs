use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use super::{CatalogError, Inventory};
use crate::inventory::domain::{
    AnswerScale, Direction, Item, ItemId, TraitDefinition, TraitId, TraitLoading,
};
use crate::inventory::matcher::ReferenceProfile;
use crate::inventory::model::CorrelationPair;
use crate::inventory::scoring::TypeAxis;

/// Reads catalog documents (JSON) and item tables (CSV) into a validated [`Inventory`].
pub struct CatalogLoader;

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    scale: Option<AnswerScale>,
    traits: Vec<TraitDefinition>,
    #[serde(default)]
    correlations: Vec<CorrelationPair>,
    items: Vec<Item>,
    #[serde(default)]
    reference_profiles: Vec<ReferenceProfile>,
    #[serde(default)]
    type_axes: Option<Vec<TypeAxis>>,
}

impl CatalogLoader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Inventory, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Inventory, CatalogError> {
        let document: CatalogDocument = serde_json::from_reader(reader)?;
        let axes = match document.type_axes {
            Some(axes) => axes,
            None => builtin_axes_for(&document.traits),
        };

        Inventory::new(
            document.scale.unwrap_or_default(),
            document.traits,
            document.correlations,
            document.items,
            document.reference_profiles,
            axes,
        )
    }

    /// Load the catalog at `path`, or the built-in catalog when there is no path
    /// or the file cannot be used.
    pub fn load_or_fallback(path: Option<&Path>) -> Inventory {
        let Some(path) = path else {
            return Inventory::builtin();
        };

        match Self::from_path(path) {
            Ok(inventory) => {
                info!(
                    path = %path.display(),
                    items = inventory.items().len(),
                    traits = inventory.model().len(),
                    "catalog loaded"
                );
                inventory
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "catalog load failed; using built-in catalog"
                );
                Inventory::builtin()
            }
        }
    }

    /// Parse an item table with one row per item/trait loading.
    ///
    /// Columns: `id, text, trait, weight, direction, facet, difficulty,
    /// discriminability, category`. Repeated ids add loadings to the item
    /// introduced by the first row; the first row's text and metadata win.
    pub fn items_from_csv<R: Read>(reader: R) -> Result<Vec<Item>, CatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut items: Vec<Item> = Vec::new();
        let mut positions: BTreeMap<ItemId, usize> = BTreeMap::new();

        for record in csv_reader.deserialize::<ItemRow>() {
            let row = record?;
            let item_id = ItemId::new(row.id.clone());
            let loading = TraitLoading {
                trait_id: TraitId::new(row.trait_id.clone()),
                weight: row.weight,
                direction: row.direction()?,
            };

            match positions.get(&item_id) {
                Some(&position) => items[position].loadings.push(loading),
                None => {
                    positions.insert(item_id.clone(), items.len());
                    items.push(Item {
                        id: item_id,
                        text: row.text,
                        loadings: vec![loading],
                        facet: row.facet,
                        difficulty: row.difficulty,
                        discriminability: row.discriminability,
                        category: row.category,
                    });
                }
            }
        }

        Ok(items)
    }

    /// Replace the item pool of `base` with the items in a CSV table.
    pub fn with_items_csv<R: Read>(base: &Inventory, reader: R) -> Result<Inventory, CatalogError> {
        let items = Self::items_from_csv(reader)?;
        base.with_items(items)
    }
}

/// The built-in axes when every pole names one of `traits`, otherwise none.
fn builtin_axes_for(traits: &[TraitDefinition]) -> Vec<TypeAxis> {
    let builtin = Inventory::builtin();
    let resolves = builtin.axes().iter().all(|axis| {
        axis.poles
            .iter()
            .all(|pole| traits.iter().any(|definition| definition.id == pole.trait_id))
    });
    if resolves {
        builtin.axes().to_vec()
    } else {
        warn!("catalog has no type_axes and the built-in axes do not fit its traits; no type code");
        Vec::new()
    }
}

#[derive(Debug, Deserialize)]
struct ItemRow {
    id: String,
    text: String,
    #[serde(rename = "trait")]
    trait_id: String,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    direction: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    facet: Option<String>,
    #[serde(default = "default_difficulty")]
    difficulty: f64,
    #[serde(default = "default_discriminability")]
    discriminability: f64,
    #[serde(default)]
    category: String,
}

impl ItemRow {
    fn direction(&self) -> Result<Direction, CatalogError> {
        match self.direction.trim().to_ascii_lowercase().as_str() {
            "" | "+" | "positive" | "pos" => Ok(Direction::Positive),
            "-" | "negative" | "neg" | "reverse" => Ok(Direction::Negative),
            other => Err(CatalogError::InvalidItem {
                item_id: ItemId::new(self.id.clone()),
                reason: format!("unknown direction '{other}'"),
            }),
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

fn default_difficulty() -> f64 {
    0.5
}

fn default_discriminability() -> f64 {
    0.5
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
