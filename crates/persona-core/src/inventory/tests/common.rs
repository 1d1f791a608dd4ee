use crate::inventory::catalog::Inventory;
use crate::inventory::domain::{
    AnswerScale, Direction, Item, ItemId, TraitDefinition, TraitId, TraitLoading,
};
use crate::inventory::matcher::ReferenceProfile;
use crate::inventory::model::CorrelationPair;
use crate::inventory::scoring::{AxisPole, TypeAxis};
use crate::inventory::session::{AssessmentError, NextItem, Session};
use crate::inventory::settings::{AssessmentConfig, AssessmentMode};

pub(super) fn trait_def(id: &str, min_questions: u32) -> TraitDefinition {
    TraitDefinition {
        id: TraitId::new(id),
        label: id.to_uppercase(),
        facets: Vec::new(),
        norm_mean: 0.5,
        norm_sd: 0.15,
        min_questions,
    }
}

pub(super) fn item(id: &str, trait_id: &str, category: &str) -> Item {
    Item {
        id: ItemId::new(id),
        text: format!("Statement {id}"),
        loadings: vec![TraitLoading {
            trait_id: TraitId::new(trait_id),
            weight: 1.0,
            direction: Direction::Positive,
        }],
        facet: None,
        difficulty: 0.5,
        discriminability: 0.5,
        category: category.to_string(),
    }
}

pub(super) fn reversed(mut item: Item) -> Item {
    for loading in &mut item.loadings {
        loading.direction = Direction::Negative;
    }
    item
}

pub(super) fn with_facet(mut item: Item, facet: &str) -> Item {
    item.facet = Some(facet.to_string());
    item
}

/// Three uncorrelated traits, two unit-weight items each.
pub(super) fn three_trait_inventory() -> Inventory {
    Inventory::new(
        AnswerScale::default(),
        vec![trait_def("a", 2), trait_def("b", 2), trait_def("c", 2)],
        Vec::new(),
        vec![
            item("a1", "a", "alpha"),
            item("a2", "a", "alpha"),
            item("b1", "b", "beta"),
            item("b2", "b", "beta"),
            item("c1", "c", "gamma"),
            item("c2", "c", "gamma"),
        ],
        vec![profile("upper", &[("a", 1.0), ("b", 1.0), ("c", 1.0)])],
        vec![axis("ab", 'A', 'B', &[("a", 1.0)])],
    )
    .expect("fixture inventory is valid")
}

/// Two traits joined by `coefficient`, two items each.
pub(super) fn correlated_inventory(coefficient: f64) -> Inventory {
    Inventory::new(
        AnswerScale::default(),
        vec![trait_def("x", 2), trait_def("y", 2)],
        vec![CorrelationPair::new("x", "y", coefficient)],
        vec![
            item("x1", "x", "xs"),
            item("x2", "x", "xs"),
            item("y1", "y", "ys"),
            item("y2", "y", "ys"),
        ],
        Vec::new(),
        Vec::new(),
    )
    .expect("fixture inventory is valid")
}

pub(super) fn profile(id: &str, scores: &[(&str, f64)]) -> ReferenceProfile {
    ReferenceProfile {
        id: id.to_string(),
        name: id.to_uppercase(),
        scores: scores
            .iter()
            .map(|(trait_id, score)| (TraitId::new(*trait_id), *score))
            .collect(),
    }
}

pub(super) fn axis(name: &str, high: char, low: char, poles: &[(&str, f64)]) -> TypeAxis {
    TypeAxis {
        name: name.to_string(),
        high,
        low,
        poles: poles
            .iter()
            .map(|(trait_id, weight)| AxisPole {
                trait_id: TraitId::new(*trait_id),
                weight: *weight,
                direction: Direction::Positive,
            })
            .collect(),
    }
}

/// Config whose item cap and soft minimum are both `items`.
pub(super) fn fixed_length(items: usize) -> AssessmentConfig {
    AssessmentConfig {
        max_items: Some(items),
        min_items: Some(items),
        ..AssessmentConfig::default()
    }
}

pub(super) fn start(inventory: &Inventory, config: AssessmentConfig, seed: Option<u64>) -> Session {
    Session::start(
        crate::inventory::domain::SessionId::new("test-session"),
        inventory,
        AssessmentMode::Comprehensive,
        seed,
        config,
    )
    .expect("session starts")
}

/// How a driven session stopped.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Stop {
    Complete,
    Exhausted,
    Limit,
}

/// Answer items until the session stops, returning the presented ids.
pub(super) fn drive(
    session: &mut Session,
    inventory: &Inventory,
    mut answer: impl FnMut(&Item) -> u8,
    limit: usize,
) -> (Vec<ItemId>, Stop) {
    let mut presented = Vec::new();
    for _ in 0..limit {
        match session.next_item(inventory) {
            Ok(NextItem::Present(item)) => {
                let value = answer(item);
                presented.push(item.id.clone());
                session
                    .submit(inventory, &item.id, value, Some(1200))
                    .expect("pending item accepts an in-scale answer");
            }
            Ok(NextItem::Complete(_)) => return (presented, Stop::Complete),
            Err(AssessmentError::ExhaustedPool { .. }) => return (presented, Stop::Exhausted),
            Err(other) => panic!("unexpected assessment error: {other:?}"),
        }
    }
    (presented, Stop::Limit)
}

pub(super) fn item_of(inventory: &Inventory, id: &str) -> Item {
    inventory
        .items()
        .get(&ItemId::new(id))
        .cloned()
        .unwrap_or_else(|| panic!("fixture item {id} exists"))
}
