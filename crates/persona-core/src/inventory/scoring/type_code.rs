use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::inventory::domain::{Direction, TraitId};
use crate::inventory::model::TraitModel;
use crate::inventory::report::Diagnostic;

/// One trait's pull on a type axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisPole {
    pub trait_id: TraitId,
    pub weight: f64,
    #[serde(default = "positive")]
    pub direction: Direction,
}

fn positive() -> Direction {
    Direction::Positive
}

/// A two-letter dichotomy computed from weighted trait scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAxis {
    pub name: String,
    /// Letter used when the axis value reaches the threshold.
    pub high: char,
    pub low: char,
    pub poles: Vec<AxisPole>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisResult {
    pub axis: String,
    pub letter: char,
    pub value: f64,
    /// Normalised distance from the threshold, `0` on the fence.
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeCode {
    pub code: String,
    pub axes: Vec<AxisResult>,
}

impl TypeCode {
    pub fn axis(&self, name: &str) -> Option<&AxisResult> {
        self.axes.iter().find(|result| result.axis == name)
    }
}

/// Map final trait scores onto the configured axes.
///
/// Poles naming traits outside the model are dropped with a
/// `CatalogMismatch` diagnostic. An axis with no usable pole sits exactly on
/// the threshold. Ties resolve to the high letter.
pub fn derive_type_code(
    axes: &[TypeAxis],
    model: &TraitModel,
    scores: &BTreeMap<TraitId, f64>,
    threshold: f64,
) -> (TypeCode, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut reported = BTreeSet::new();
    let mut code = String::with_capacity(axes.len());
    let mut results = Vec::with_capacity(axes.len());
    let span = threshold.max(1.0 - threshold).max(f64::EPSILON);

    for axis in axes {
        let mut weighted = 0.0;
        let mut total = 0.0;
        for pole in &axis.poles {
            if !model.contains(&pole.trait_id) {
                if reported.insert(pole.trait_id.clone()) {
                    warn!(axis = %axis.name, trait_id = %pole.trait_id, "type axis pole ignored");
                    diagnostics.push(Diagnostic::CatalogMismatch {
                        trait_id: pole.trait_id.clone(),
                        context: format!("type axis '{}'", axis.name),
                    });
                }
                continue;
            }
            let score = scores.get(&pole.trait_id).copied().unwrap_or(0.5);
            weighted += pole.weight * pole.direction.orient(score);
            total += pole.weight;
        }

        let value = if total > 0.0 { weighted / total } else { threshold };
        let letter = if value >= threshold { axis.high } else { axis.low };
        let confidence = ((value - threshold).abs() / span).clamp(0.0, 1.0);

        code.push(letter);
        results.push(AxisResult {
            axis: axis.name.clone(),
            letter,
            value,
            confidence,
        });
    }

    (
        TypeCode {
            code,
            axes: results,
        },
        diagnostics,
    )
}
