use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{TraitDefinition, TraitId};

/// A listed correlation between two traits, as read from catalog data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub a: TraitId,
    pub b: TraitId,
    pub coefficient: f64,
}

impl CorrelationPair {
    pub fn new(a: &str, b: &str, coefficient: f64) -> Self {
        Self {
            a: TraitId::new(a),
            b: TraitId::new(b),
            coefficient,
        }
    }
}

/// Dense symmetric trait-by-trait correlation table with a unit diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    size: usize,
    values: Vec<f64>,
}

impl CorrelationMatrix {
    pub fn identity(size: usize) -> Self {
        let mut values = vec![0.0; size * size];
        for index in 0..size {
            values[index * size + index] = 1.0;
        }
        Self { size, values }
    }

    /// Build from a pair list. Both cells of a pair are always written together,
    /// so the result is symmetric whatever the input contains.
    pub fn from_pairs(index: &BTreeMap<TraitId, usize>, pairs: &[CorrelationPair]) -> Self {
        let mut matrix = Self::identity(index.len());

        for pair in pairs {
            let (Some(&i), Some(&j)) = (index.get(&pair.a), index.get(&pair.b)) else {
                warn!(
                    a = %pair.a,
                    b = %pair.b,
                    "correlation pair references unknown trait; skipped"
                );
                continue;
            };
            if i == j {
                continue;
            }
            if !pair.coefficient.is_finite() {
                warn!(a = %pair.a, b = %pair.b, "non-finite correlation coefficient; skipped");
                continue;
            }
            let coefficient = pair.coefficient.clamp(-1.0, 1.0);
            matrix.values[i * matrix.size + j] = coefficient;
            matrix.values[j * matrix.size + i] = coefficient;
        }

        matrix
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i >= self.size || j >= self.size {
            return 0.0;
        }
        self.values[i * self.size + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.size..(i + 1) * self.size]
    }

    /// Off-diagonal pairs `(i, j, r)` with `i < j` and `|r| >= min_abs`.
    pub fn strong_pairs(&self, min_abs: f64) -> Vec<(usize, usize, f64)> {
        let mut pairs = Vec::new();
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                let r = self.get(i, j);
                if r != 0.0 && r.abs() >= min_abs {
                    pairs.push((i, j, r));
                }
            }
        }
        pairs
    }
}

/// The trait set, their facets, and the correlation table used for smoothing.
#[derive(Debug, Clone)]
pub struct TraitModel {
    traits: Vec<TraitDefinition>,
    index: BTreeMap<TraitId, usize>,
    correlations: CorrelationMatrix,
    pairs: Vec<CorrelationPair>,
}

impl TraitModel {
    /// Trait ids are assumed unique; the catalog loader checks this before calling.
    pub fn new(traits: Vec<TraitDefinition>, pairs: Vec<CorrelationPair>) -> Self {
        let index = traits
            .iter()
            .enumerate()
            .map(|(position, definition)| (definition.id.clone(), position))
            .collect::<BTreeMap<_, _>>();
        let correlations = CorrelationMatrix::from_pairs(&index, &pairs);

        Self {
            traits,
            index,
            correlations,
            pairs,
        }
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    pub fn traits(&self) -> &[TraitDefinition] {
        &self.traits
    }

    pub fn index_of(&self, trait_id: &TraitId) -> Option<usize> {
        self.index.get(trait_id).copied()
    }

    pub fn contains(&self, trait_id: &TraitId) -> bool {
        self.index.contains_key(trait_id)
    }

    pub fn definition(&self, trait_id: &TraitId) -> Option<&TraitDefinition> {
        self.index_of(trait_id).map(|position| &self.traits[position])
    }

    pub fn correlations(&self) -> &CorrelationMatrix {
        &self.correlations
    }

    /// Correlation by id; unknown traits correlate with nothing.
    pub fn correlation(&self, a: &TraitId, b: &TraitId) -> f64 {
        match (self.index_of(a), self.index_of(b)) {
            (Some(i), Some(j)) => self.correlations.get(i, j),
            _ => 0.0,
        }
    }

    pub fn pairs(&self) -> &[CorrelationPair] {
        &self.pairs
    }
}
