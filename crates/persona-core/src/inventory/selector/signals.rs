use std::collections::{BTreeMap, BTreeSet};

use crate::inventory::domain::{Item, TraitId};

/// Expected gain from asking about traits we are still unsure of.
/// A trait without data counts with its full loading weight.
pub fn information_value(item: &Item, confidence: &BTreeMap<TraitId, f64>) -> f64 {
    item.loadings
        .iter()
        .map(|loading| {
            let known = confidence
                .get(&loading.trait_id)
                .copied()
                .unwrap_or(0.0)
                .clamp(0.0, 1.0);
            loading.weight * (1.0 - known)
        })
        .sum()
}

/// Shortfall below target per trait, scaled by `1 + shortfall` so traits far
/// behind pull harder and met traits contribute nothing.
pub fn coverage_need(
    item: &Item,
    coverage: &BTreeMap<TraitId, u32>,
    targets: &BTreeMap<TraitId, u32>,
) -> f64 {
    item.trait_ids()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter_map(|trait_id| {
            let target = *targets.get(trait_id)?;
            let shortfall = shortfall(coverage.get(trait_id).copied().unwrap_or(0), target);
            Some(shortfall * (1.0 + shortfall))
        })
        .sum()
}

pub(crate) fn shortfall(current: u32, target: u32) -> f64 {
    if target == 0 {
        return 0.0;
    }
    f64::from(target.saturating_sub(current)) / f64::from(target)
}

/// Desired difficulty at `progress` (0 at the first item, 1 at the cap).
pub fn target_difficulty(progress: f64) -> f64 {
    let progress = progress.clamp(0.0, 1.0);
    if progress < 0.2 {
        0.30 + (progress / 0.2) * 0.10
    } else if progress < 0.7 {
        0.40 + ((progress - 0.2) / 0.5) * 0.30
    } else {
        0.70 - ((progress - 0.7) / 0.3) * 0.10
    }
}

pub fn difficulty_fit(item: &Item, progress: f64) -> f64 {
    (1.0 - (item.difficulty - target_difficulty(progress)).abs()).clamp(0.0, 1.0)
}

/// `1 - mean overlap` with the recent window; a fresh window scores 1.
pub fn diversity_bonus(item: &Item, recent: &[&Item]) -> f64 {
    if recent.is_empty() {
        return 1.0;
    }
    let total: f64 = recent.iter().map(|other| overlap(item, other)).sum();
    (1.0 - total / recent.len() as f64).clamp(0.0, 1.0)
}

fn overlap(a: &Item, b: &Item) -> f64 {
    let category = if a.category == b.category { 1.0 } else { 0.0 };
    let left: BTreeSet<_> = a.trait_ids().collect();
    let right: BTreeSet<_> = b.trait_ids().collect();
    let union = left.union(&right).count();
    let jaccard = if union == 0 {
        0.0
    } else {
        left.intersection(&right).count() as f64 / union as f64
    };
    0.5 * category + 0.5 * jaccard
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::domain::{Direction, ItemId, TraitLoading};

    fn item(id: &str, traits: &[&str], category: &str, difficulty: f64) -> Item {
        Item {
            id: ItemId::new(id),
            text: id.to_string(),
            loadings: traits
                .iter()
                .map(|trait_id| TraitLoading {
                    trait_id: TraitId::new(*trait_id),
                    weight: 1.0,
                    direction: Direction::Positive,
                })
                .collect(),
            facet: None,
            difficulty,
            discriminability: 0.5,
            category: category.to_string(),
        }
    }

    #[test]
    fn unseen_traits_carry_full_information() {
        let candidate = item("q", &["a", "b"], "social", 0.5);
        let mut confidence = BTreeMap::new();
        assert!((information_value(&candidate, &confidence) - 2.0).abs() < 1e-12);
        confidence.insert(TraitId::new("a"), 0.75);
        assert!((information_value(&candidate, &confidence) - 1.25).abs() < 1e-12);
    }

    #[test]
    fn coverage_need_vanishes_once_target_met() {
        let candidate = item("q", &["a"], "social", 0.5);
        let targets = BTreeMap::from([(TraitId::new("a"), 2)]);
        let mut coverage = BTreeMap::new();
        assert!((coverage_need(&candidate, &coverage, &targets) - 2.0).abs() < 1e-12);
        coverage.insert(TraitId::new("a"), 1);
        assert!((coverage_need(&candidate, &coverage, &targets) - 0.75).abs() < 1e-12);
        coverage.insert(TraitId::new("a"), 2);
        assert_eq!(coverage_need(&candidate, &coverage, &targets), 0.0);
    }

    #[test]
    fn difficulty_eases_in_ramps_then_eases_off() {
        assert!((target_difficulty(0.0) - 0.30).abs() < 1e-12);
        assert!((target_difficulty(0.2) - 0.40).abs() < 1e-12);
        assert!((target_difficulty(0.7) - 0.70).abs() < 1e-12);
        assert!((target_difficulty(1.0) - 0.60).abs() < 1e-12);
        assert!(target_difficulty(0.45) > target_difficulty(0.1));
    }

    #[test]
    fn repeated_topics_lose_the_diversity_bonus() {
        let candidate = item("q", &["a"], "social", 0.5);
        let same = item("r", &["a"], "social", 0.5);
        let different = item("s", &["b"], "work", 0.5);
        assert_eq!(diversity_bonus(&candidate, &[]), 1.0);
        assert_eq!(diversity_bonus(&candidate, &[&same]), 0.0);
        assert_eq!(diversity_bonus(&candidate, &[&different]), 1.0);
        assert!((diversity_bonus(&candidate, &[&same, &different]) - 0.5).abs() < 1e-12);
    }
}
