use std::collections::BTreeMap;

use super::{Inventory, ItemCatalog};
use crate::inventory::domain::{
    AnswerScale, Direction, Item, ItemId, TraitDefinition, TraitId, TraitLoading,
};
use crate::inventory::matcher::ReferenceProfile;
use crate::inventory::model::{CorrelationPair, TraitModel};
use crate::inventory::scoring::{AxisPole, TypeAxis};

const HONESTY: &str = "honesty_humility";
const EMOTIONALITY: &str = "emotionality";
const EXTRAVERSION: &str = "extraversion";
const AGREEABLENESS: &str = "agreeableness";
const CONSCIENTIOUSNESS: &str = "conscientiousness";
const OPENNESS: &str = "openness";
const DOMINANCE: &str = "dominance";
const VIGILANCE: &str = "vigilance";

/// Trait order used by the reference gallery rows below.
const GALLERY_ORDER: [&str; 8] = [
    HONESTY,
    EMOTIONALITY,
    EXTRAVERSION,
    AGREEABLENESS,
    CONSCIENTIOUSNESS,
    OPENNESS,
    DOMINANCE,
    VIGILANCE,
];

pub(super) fn inventory() -> Inventory {
    Inventory {
        scale: AnswerScale::default(),
        model: TraitModel::new(traits(), correlations()),
        items: ItemCatalog::new(items()),
        references: references(),
        axes: axes(),
    }
}

pub(super) fn traits() -> Vec<TraitDefinition> {
    let definition = |id: &str, label: &str, facets: [&str; 2], mean: f64| TraitDefinition {
        id: TraitId::new(id),
        label: label.to_string(),
        facets: facets.iter().map(|facet| facet.to_string()).collect(),
        norm_mean: mean,
        norm_sd: 0.15,
        min_questions: 3,
    };

    vec![
        definition(HONESTY, "Honesty-Humility", ["sincerity", "modesty"], 0.55),
        definition(EMOTIONALITY, "Emotionality", ["anxiety", "sentimentality"], 0.5),
        definition(EXTRAVERSION, "Extraversion", ["sociability", "liveliness"], 0.5),
        definition(AGREEABLENESS, "Agreeableness", ["forgiveness", "patience"], 0.52),
        definition(
            CONSCIENTIOUSNESS,
            "Conscientiousness",
            ["organization", "diligence"],
            0.53,
        ),
        definition(OPENNESS, "Openness", ["inquisitiveness", "creativity"], 0.5),
        definition(DOMINANCE, "Dominance", ["assertiveness", "leadership"], 0.45),
        definition(VIGILANCE, "Vigilance", ["suspicion", "guardedness"], 0.45),
    ]
}

pub(super) fn correlations() -> Vec<CorrelationPair> {
    vec![
        CorrelationPair::new(AGREEABLENESS, VIGILANCE, -0.60),
        CorrelationPair::new(AGREEABLENESS, DOMINANCE, -0.55),
        CorrelationPair::new(EXTRAVERSION, DOMINANCE, 0.56),
        CorrelationPair::new(HONESTY, AGREEABLENESS, 0.30),
        CorrelationPair::new(HONESTY, DOMINANCE, -0.35),
        CorrelationPair::new(EMOTIONALITY, VIGILANCE, 0.25),
        CorrelationPair::new(EMOTIONALITY, EXTRAVERSION, -0.20),
        CorrelationPair::new(OPENNESS, EXTRAVERSION, 0.20),
        CorrelationPair::new(CONSCIENTIOUSNESS, OPENNESS, -0.10),
    ]
}

struct Draft {
    id: &'static str,
    text: &'static str,
    loadings: &'static [(&'static str, f64, Direction)],
    facet: &'static str,
    difficulty: f64,
    discriminability: f64,
    category: &'static str,
}

const POS: Direction = Direction::Positive;
const NEG: Direction = Direction::Negative;

#[rustfmt::skip]
const DRAFTS: &[Draft] = &[
    Draft { id: "hh1", text: "I would not flatter someone just to get ahead.", loadings: &[(HONESTY, 1.0, POS)], facet: "sincerity", difficulty: 0.35, discriminability: 0.65, category: "values" },
    Draft { id: "hh2", text: "I deserve more respect than the average person.", loadings: &[(HONESTY, 1.0, NEG), (DOMINANCE, 0.4, POS)], facet: "modesty", difficulty: 0.55, discriminability: 0.7, category: "self-image" },
    Draft { id: "hh3", text: "I would keep extra change a cashier gave me by mistake.", loadings: &[(HONESTY, 1.0, NEG)], facet: "sincerity", difficulty: 0.7, discriminability: 0.55, category: "values" },
    Draft { id: "em1", text: "I worry about things that might go wrong.", loadings: &[(EMOTIONALITY, 1.0, POS)], facet: "anxiety", difficulty: 0.25, discriminability: 0.7, category: "feelings" },
    Draft { id: "em2", text: "I get emotional when saying goodbye to close friends.", loadings: &[(EMOTIONALITY, 1.0, POS)], facet: "sentimentality", difficulty: 0.45, discriminability: 0.6, category: "relationships" },
    Draft { id: "em3", text: "I stay calm when others are panicking.", loadings: &[(EMOTIONALITY, 1.0, NEG)], facet: "anxiety", difficulty: 0.65, discriminability: 0.65, category: "stress" },
    Draft { id: "ex1", text: "I enjoy meeting new people at gatherings.", loadings: &[(EXTRAVERSION, 1.0, POS)], facet: "sociability", difficulty: 0.2, discriminability: 0.75, category: "social" },
    Draft { id: "ex2", text: "I usually feel full of energy around others.", loadings: &[(EXTRAVERSION, 1.0, POS)], facet: "liveliness", difficulty: 0.5, discriminability: 0.6, category: "energy" },
    Draft { id: "ex3", text: "I prefer to spend my free time alone.", loadings: &[(EXTRAVERSION, 1.0, NEG)], facet: "sociability", difficulty: 0.6, discriminability: 0.7, category: "social" },
    Draft { id: "ag1", text: "I forgive people quickly after an argument.", loadings: &[(AGREEABLENESS, 1.0, POS)], facet: "forgiveness", difficulty: 0.3, discriminability: 0.7, category: "conflict" },
    Draft { id: "ag2", text: "I lose my temper when people are slow.", loadings: &[(AGREEABLENESS, 1.0, NEG)], facet: "patience", difficulty: 0.55, discriminability: 0.6, category: "stress" },
    Draft { id: "ag3", text: "I look for compromise rather than winning a dispute.", loadings: &[(AGREEABLENESS, 1.0, POS), (DOMINANCE, 0.4, NEG)], facet: "patience", difficulty: 0.7, discriminability: 0.65, category: "conflict" },
    Draft { id: "co1", text: "I keep my workspace tidy and organized.", loadings: &[(CONSCIENTIOUSNESS, 1.0, POS)], facet: "organization", difficulty: 0.25, discriminability: 0.65, category: "work" },
    Draft { id: "co2", text: "I finish tasks well before they are due.", loadings: &[(CONSCIENTIOUSNESS, 1.0, POS)], facet: "diligence", difficulty: 0.5, discriminability: 0.7, category: "work" },
    Draft { id: "co3", text: "I often leave things until the last minute.", loadings: &[(CONSCIENTIOUSNESS, 1.0, NEG)], facet: "diligence", difficulty: 0.65, discriminability: 0.6, category: "habits" },
    Draft { id: "op1", text: "I like reading about unfamiliar subjects.", loadings: &[(OPENNESS, 1.0, POS)], facet: "inquisitiveness", difficulty: 0.3, discriminability: 0.65, category: "ideas" },
    Draft { id: "op2", text: "I enjoy creating art, music, or writing.", loadings: &[(OPENNESS, 1.0, POS)], facet: "creativity", difficulty: 0.45, discriminability: 0.6, category: "creativity" },
    Draft { id: "op3", text: "I find abstract discussions a waste of time.", loadings: &[(OPENNESS, 1.0, NEG)], facet: "inquisitiveness", difficulty: 0.75, discriminability: 0.7, category: "ideas" },
    Draft { id: "do1", text: "I take charge when a group lacks direction.", loadings: &[(DOMINANCE, 1.0, POS), (EXTRAVERSION, 0.3, POS)], facet: "leadership", difficulty: 0.35, discriminability: 0.75, category: "leadership" },
    Draft { id: "do2", text: "I say what I think even if it causes friction.", loadings: &[(DOMINANCE, 1.0, POS)], facet: "assertiveness", difficulty: 0.55, discriminability: 0.65, category: "conflict" },
    Draft { id: "do3", text: "I am happy to let others make the decisions.", loadings: &[(DOMINANCE, 1.0, NEG)], facet: "leadership", difficulty: 0.6, discriminability: 0.6, category: "leadership" },
    Draft { id: "vi1", text: "I suspect people have hidden motives.", loadings: &[(VIGILANCE, 1.0, POS)], facet: "suspicion", difficulty: 0.4, discriminability: 0.7, category: "trust" },
    Draft { id: "vi2", text: "I keep personal matters to myself.", loadings: &[(VIGILANCE, 1.0, POS)], facet: "guardedness", difficulty: 0.3, discriminability: 0.55, category: "privacy" },
    Draft { id: "vi3", text: "I trust strangers until they give me a reason not to.", loadings: &[(VIGILANCE, 1.0, NEG), (AGREEABLENESS, 0.3, POS)], facet: "suspicion", difficulty: 0.7, discriminability: 0.65, category: "trust" },
];

pub(super) fn items() -> Vec<Item> {
    DRAFTS
        .iter()
        .map(|draft| Item {
            id: ItemId::new(draft.id),
            text: draft.text.to_string(),
            loadings: draft
                .loadings
                .iter()
                .map(|(trait_id, weight, direction)| TraitLoading {
                    trait_id: TraitId::new(*trait_id),
                    weight: *weight,
                    direction: *direction,
                })
                .collect(),
            facet: Some(draft.facet.to_string()),
            difficulty: draft.difficulty,
            discriminability: draft.discriminability,
            category: draft.category.to_string(),
        })
        .collect()
}

pub(super) fn references() -> Vec<ReferenceProfile> {
    // Columns follow GALLERY_ORDER.
    let rows: [(&str, &str, [f64; 8]); 10] = [
        ("mentor", "The Mentor", [0.80, 0.60, 0.60, 0.80, 0.70, 0.60, 0.35, 0.25]),
        ("strategist", "The Strategist", [0.55, 0.30, 0.35, 0.40, 0.80, 0.80, 0.70, 0.55]),
        ("commander", "The Commander", [0.35, 0.25, 0.75, 0.30, 0.75, 0.50, 0.90, 0.60]),
        ("diplomat", "The Diplomat", [0.75, 0.55, 0.65, 0.85, 0.55, 0.60, 0.30, 0.20]),
        ("explorer", "The Explorer", [0.50, 0.35, 0.70, 0.55, 0.30, 0.90, 0.55, 0.30]),
        ("guardian", "The Guardian", [0.70, 0.55, 0.40, 0.60, 0.90, 0.30, 0.45, 0.60]),
        ("artisan", "The Artisan", [0.60, 0.65, 0.35, 0.60, 0.45, 0.85, 0.30, 0.40]),
        ("performer", "The Performer", [0.40, 0.60, 0.90, 0.60, 0.35, 0.65, 0.65, 0.25]),
        ("sentinel", "The Sentinel", [0.60, 0.45, 0.25, 0.35, 0.75, 0.35, 0.50, 0.85]),
        ("caregiver", "The Caregiver", [0.80, 0.80, 0.55, 0.85, 0.60, 0.45, 0.20, 0.25]),
    ];

    rows.iter()
        .map(|(id, name, scores)| ReferenceProfile {
            id: id.to_string(),
            name: name.to_string(),
            scores: GALLERY_ORDER
                .iter()
                .zip(scores.iter())
                .map(|(trait_id, score)| (TraitId::new(*trait_id), *score))
                .collect::<BTreeMap<_, _>>(),
        })
        .collect()
}

pub(super) fn axes() -> Vec<TypeAxis> {
    let pole = |trait_id: &str, weight: f64, direction: Direction| AxisPole {
        trait_id: TraitId::new(trait_id),
        weight,
        direction,
    };

    vec![
        TypeAxis {
            name: "energy".to_string(),
            high: 'E',
            low: 'I',
            poles: vec![pole(EXTRAVERSION, 0.75, POS), pole(DOMINANCE, 0.25, POS)],
        },
        TypeAxis {
            name: "perception".to_string(),
            high: 'N',
            low: 'S',
            poles: vec![pole(OPENNESS, 0.7, POS), pole(CONSCIENTIOUSNESS, 0.3, NEG)],
        },
        TypeAxis {
            name: "judgment".to_string(),
            high: 'F',
            low: 'T',
            poles: vec![pole(AGREEABLENESS, 0.6, POS), pole(EMOTIONALITY, 0.4, POS)],
        },
        TypeAxis {
            name: "lifestyle".to_string(),
            high: 'J',
            low: 'P',
            poles: vec![pole(CONSCIENTIOUSNESS, 0.7, POS), pole(OPENNESS, 0.3, NEG)],
        },
    ]
}
