use std::sync::Arc;

use persona_core::inventory::{
    AssessmentConfig, AssessmentMode, AssessmentService, CatalogLoader, Inventory,
    MemorySnapshotStore, NextItem, ResultQuality, SessionId, SnapshotStore, TraitId,
};

const SMALL_CATALOG: &str = r#"{
  "scale": { "min": 1, "max": 7 },
  "traits": [
    { "id": "warmth", "label": "Warmth", "facets": ["kindness"], "min_questions": 2 },
    { "id": "drive", "label": "Drive", "min_questions": 2 }
  ],
  "correlations": [ { "a": "warmth", "b": "drive", "coefficient": 0.2 } ],
  "items": [
    { "id": "w1", "text": "I check in on friends.", "category": "social", "facet": "kindness",
      "difficulty": 0.3, "discriminability": 0.6,
      "loadings": [ { "trait_id": "warmth", "weight": 1.0, "direction": "positive" } ] },
    { "id": "w2", "text": "Other people's problems bore me.", "category": "social",
      "difficulty": 0.6, "discriminability": 0.6,
      "loadings": [ { "trait_id": "warmth", "weight": 1.0, "direction": "negative" } ] },
    { "id": "d1", "text": "I set ambitious goals.", "category": "work",
      "difficulty": 0.4, "discriminability": 0.7,
      "loadings": [ { "trait_id": "drive", "weight": 1.0, "direction": "positive" } ] },
    { "id": "d2", "text": "I push through setbacks.", "category": "work",
      "difficulty": 0.5, "discriminability": 0.7,
      "loadings": [ { "trait_id": "drive", "weight": 0.8, "direction": "positive" } ] }
  ],
  "reference_profiles": [
    { "id": "mentor", "name": "Mentor", "scores": { "warmth": 0.9, "drive": 0.6 } },
    { "id": "climber", "name": "Climber", "scores": { "warmth": 0.2, "drive": 0.95 } }
  ],
  "type_axes": [
    { "name": "focus", "high": "P", "low": "T",
      "poles": [ { "trait_id": "warmth", "weight": 1.0 } ] }
  ]
}"#;

#[test]
fn builtin_demo_runs_to_a_complete_report() {
    let inventory = Arc::new(Inventory::builtin());
    let store = Arc::new(MemorySnapshotStore::new());
    let service = AssessmentService::new(
        inventory.clone(),
        store.clone(),
        AssessmentConfig::default(),
    );
    let mut session = service
        .start(AssessmentMode::Demo, Some(2024))
        .expect("session starts");

    let mut answered = 0;
    loop {
        let item_id = match service.next_item(&mut session) {
            Ok(NextItem::Present(item)) => item.id.clone(),
            Ok(NextItem::Complete(_)) => break,
            Err(err) => {
                assert!(answered > 0, "pool exhausted before any answer: {err}");
                break;
            }
        };
        let answer = 1 + (answered % 5) as u8;
        service
            .submit(&mut session, &item_id, answer, Some(900))
            .expect("answer accepted");
        answered += 1;
    }

    let report = service.finalize(&mut session);
    assert_eq!(report.answered, answered);
    assert_eq!(report.traits.len(), inventory.model().len());
    assert_eq!(report.type_code.code.chars().count(), 4);
    assert_eq!(report.matches.len(), inventory.references().len());
    assert!(report.matches.top(9).len() <= 9);
    assert!(report.quality != ResultQuality::Degenerate);
    for score in &report.traits {
        assert!((0.0..=1.0).contains(&score.score), "{score:?}");
        assert!((0.0..=1.0).contains(&score.confidence));
        for facet in score.facets.values() {
            assert!((0.0..=1.0).contains(facet));
        }
    }
    for entry in report.matches.all() {
        assert!((0.0..=1.0).contains(&entry.similarity));
    }
    let similarities: Vec<f64> = report.matches.all().iter().map(|m| m.similarity).collect();
    assert!(similarities.windows(2).all(|pair| pair[0] >= pair[1]));

    let stored = store
        .load(session.id())
        .expect("store readable")
        .expect("final snapshot stored");
    assert!(stored.is_final());
}

#[test]
fn json_catalog_drives_a_custom_scale_session() {
    let inventory = Arc::new(
        CatalogLoader::from_reader(SMALL_CATALOG.as_bytes()).expect("catalog parses"),
    );
    let store = Arc::new(MemorySnapshotStore::new());
    let config = AssessmentConfig {
        max_items: Some(4),
        min_items: Some(4),
        ..AssessmentConfig::default()
    };
    let service = AssessmentService::new(inventory.clone(), store, config);
    let mut session = service
        .start_with_id(SessionId::new("custom"), AssessmentMode::Comprehensive, None)
        .expect("session starts");

    while let Ok(NextItem::Present(item)) = service.next_item(&mut session) {
        let item_id = item.id.clone();
        service
            .submit(&mut session, &item_id, 7, None)
            .expect("7 is on this scale");
    }

    let report = service.finalize(&mut session);
    assert_eq!(report.answered, 4);
    let warmth = report
        .trait_score(&TraitId::new("warmth"))
        .expect("warmth scored");
    // One agreeing answer and one reverse-keyed agreeing answer.
    assert!(warmth.score < 0.55 && warmth.score > 0.45, "{warmth:?}");
    assert_eq!(warmth.facets.get("kindness").copied(), Some(1.0));
    assert_eq!(report.type_code.axes[0].axis, "focus");
    assert_eq!(
        report.matches.best().map(|m| m.profile_id.as_str()),
        Some("climber")
    );
}

#[test]
fn missing_catalog_file_falls_back_to_the_builtin_catalog() {
    let dir = tempfile::tempdir().expect("tempdir");
    let inventory = CatalogLoader::load_or_fallback(Some(&dir.path().join("absent.json")));
    assert_eq!(inventory.items().len(), Inventory::builtin().items().len());
    assert_eq!(inventory.model().len(), 8);
}

#[test]
fn catalog_without_type_axes_reports_no_type_code() {
    let axes_at = SMALL_CATALOG.find("\"type_axes\"").expect("fixture has axes");
    let comma = SMALL_CATALOG[..axes_at].rfind(',').expect("axes follow another key");
    let document = format!("{}\n}}", &SMALL_CATALOG[..comma]);
    let inventory = Arc::new(CatalogLoader::from_reader(document.as_bytes()).expect("parses"));
    assert!(inventory.axes().is_empty());

    let service = AssessmentService::new(
        inventory,
        Arc::new(MemorySnapshotStore::new()),
        AssessmentConfig::default(),
    );
    let mut session = service
        .start(AssessmentMode::Comprehensive, Some(5))
        .expect("session starts");
    while let Ok(NextItem::Present(item)) = service.next_item(&mut session) {
        let item_id = item.id.clone();
        service
            .submit(&mut session, &item_id, 6, None)
            .expect("answer accepted");
    }

    let report = service.finalize(&mut session);
    assert!(report.answered > 0);
    assert!(report.type_code.code.is_empty());
    assert!(report.type_code.axes.is_empty());
    assert_eq!(report.traits.len(), 2);
}
