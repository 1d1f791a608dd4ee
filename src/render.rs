use persona_core::error::AppError;
use persona_core::inventory::{FinalReport, Inventory};

/// Print the report as text, or as pretty JSON when `json` is set.
pub(crate) fn finish(report: &FinalReport, display_top: usize, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        render_report(report, display_top);
    }
    Ok(())
}

fn render_report(report: &FinalReport, display_top: usize) {
    println!("\nAssessment results");
    println!(
        "Ended: {} | quality {} | {} answered, {} skipped",
        report.termination.label(),
        report.quality.label(),
        report.answered,
        report.skipped
    );
    println!(
        "Reliability {:.0}% | mean confidence {:.0}%",
        report.reliability * 100.0,
        report.mean_confidence * 100.0
    );
    if report.is_low_quality() {
        println!("Too few answers for a dependable profile; treat these scores as rough.");
    }

    println!("\nTraits");
    for score in &report.traits {
        println!(
            "- {}: {:.0}% (T {:.0}, {} responses, confidence {:.0}%)",
            score.label,
            score.score * 100.0,
            score.t_score,
            score.responses,
            score.confidence * 100.0
        );
        for (facet, value) in &score.facets {
            println!("    {}: {:.0}%", facet, value * 100.0);
        }
    }

    if !report.type_code.code.is_empty() {
        println!("\nType {}", report.type_code.code);
        for axis in &report.type_code.axes {
            println!(
                "- {}: {} ({:.0}% clear)",
                axis.axis,
                axis.letter,
                axis.confidence * 100.0
            );
        }
    }

    if !report.matches.is_empty() {
        println!("\nClosest reference profiles");
        for entry in report.matches.top(display_top) {
            println!("- {}: {:.0}%", entry.name, entry.similarity * 100.0);
        }
    }

    if !report.adjustments.is_empty() {
        println!(
            "\n{} score(s) adjusted for consistency with correlated traits",
            report.adjustments.len()
        );
    }

    if !report.diagnostics.is_empty() {
        println!("\nNotes");
        for diagnostic in &report.diagnostics {
            println!("- {}", diagnostic.summary());
        }
    }
}

pub(crate) fn catalog(inventory: &Inventory) {
    let scale = inventory.scale();
    let per_trait = inventory.items().items_per_trait();

    println!("Catalog");
    println!(
        "{} items, {} traits, answer scale {}-{}",
        inventory.items().len(),
        inventory.model().len(),
        scale.min,
        scale.max
    );

    println!("\nTraits");
    for definition in inventory.model().traits() {
        println!(
            "- {} ({}): {} items, target {}",
            definition.label,
            definition.id,
            per_trait.get(&definition.id).copied().unwrap_or(0),
            definition.min_questions
        );
    }

    println!("\nReference profiles: {}", inventory.references().len());
    let axes: Vec<String> = inventory
        .axes()
        .iter()
        .map(|axis| format!("{} ({}/{})", axis.name, axis.high, axis.low))
        .collect();
    println!("Type axes: {}", axes.join(", "));
}
