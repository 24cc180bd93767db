use crate::infra::InMemoryCriteriaRegistry;
use clap::Args;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use trial_curation::error::AppError;
use trial_curation::workflows::adjudication::AdjudicationService;
use trial_curation::workflows::eligibility::{build_eligibility_sections, Section, SectionItem};

const DEMO_TRIAL: i64 = 7;

#[derive(Args, Debug, Default)]
pub(crate) struct SectionsArgs {
    /// Raw matched-criteria payload to render; a built-in sample is used
    /// when omitted
    #[arg(long)]
    pub(crate) file: Option<PathBuf>,
}

/// Walk the full adjudication lifecycle against the in-memory registry:
/// group, save, publish, and accept, printing each transition.
pub(crate) async fn run_adjudication_demo() -> Result<(), AppError> {
    let registry = Arc::new(InMemoryCriteriaRegistry::seeded());
    let service = AdjudicationService::new(registry);

    service.load().await?;
    let Some(study) = service.studies().into_iter().next() else {
        println!("no studies are open for adjudication");
        return Ok(());
    };
    println!(
        "adjudicating {} - {} (criteria set {})",
        study.study.code, study.study.name, study.eligibility_criteria_id
    );

    let grouped = service.select_study(DEMO_TRIAL).await?;
    print_groups(&grouped);

    println!("\nsaving staging criterion 101 ...");
    let view = service.save(101).await?;
    println!(
        "  -> status {}, publishable: {}",
        view.status.label(),
        view.can_publish
    );

    println!("publishing staging criterion 101 ...");
    let view = service.publish(101, true).await?;
    println!("  -> status {}", view.status.label());

    println!("accepting staging criterion 102 against the catalog ...");
    let view = service.accept(102, true).await?;
    println!("  -> status {}, code {}", view.status.label(), view.code);

    let grouped = service.grouped().await;
    println!();
    print_groups(&grouped);
    Ok(())
}

fn print_groups(grouped: &trial_curation::workflows::adjudication::GroupedAdjudication) {
    for group in &grouped.groups {
        println!("{} ({})", group.status.label(), group.count);
        for row in &group.rows {
            println!(
                "  #{} {} [{}]",
                row.id,
                row.code,
                row.actions.join("/")
            );
        }
    }
}

/// Render an eligibility payload into the six display sections.
pub(crate) fn run_sections_demo(args: SectionsArgs) -> Result<(), AppError> {
    let payload = match args.file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw).map_err(|err| {
                std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())
            })?
        }
        None => sample_payload(),
    };

    for section in build_eligibility_sections(&payload) {
        print_section(&section);
    }
    Ok(())
}

fn print_section(section: &Section) {
    println!("{} [{:?}]", section.title, section.status);
    for item in &section.items {
        print_item(item, 1);
    }
}

fn print_item(item: &SectionItem, depth: usize) {
    let indent = "  ".repeat(depth);
    match item {
        SectionItem::Leaf { text, matched } => {
            let marker = match matched {
                Some(true) => "+",
                Some(false) => "x",
                None => "?",
            };
            println!("{indent}{marker} {text}");
        }
        SectionItem::Group { text, children, .. } => {
            println!("{indent}* {text}");
            for child in children {
                print_item(child, depth + 1);
            }
        }
    }
}

fn sample_payload() -> serde_json::Value {
    json!({
        "1": {
            "operator": "AND",
            "criteria": [
                { "fieldName": "Current Age", "operator": "gte", "fieldValue": 18, "isMatched": true },
                { "fieldName": "Current Age", "operator": "lte", "fieldValue": 75, "isMatched": true },
            ],
        },
        "2": {
            "operator": "OR",
            "criteria": [
                { "fieldName": "Hemoglobin", "operator": "gte", "fieldValue": 9, "isMatched": false },
                { "fieldName": "Platelet Count", "operator": "gte", "fieldValue": 75 },
            ],
        },
        "3": { "fieldName": "Current Diagnosis", "operator": "eq", "fieldValueLabel": "Acute Myeloid Leukemia", "isMatched": true },
    })
}
