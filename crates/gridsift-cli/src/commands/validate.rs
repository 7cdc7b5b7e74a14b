use std::path::Path;

use anyhow::Result;
use gridsift_filter::{ExpertRule, Filter};

use gridsift_cli::store::read_filter_file;

pub fn handle(path: &Path) -> Result<()> {
    let (id, filter) = read_filter_file(path)?;
    let kind = filter
        .equipment_kind()
        .map(|kind| kind.to_string())
        .unwrap_or_else(|| "any kind".to_string());

    match &filter {
        Filter::Criteria(criteria) if criteria.is_empty() => {
            println!("CRITERIA filter on {kind}: no constraint, selects every {kind}");
        }
        Filter::Criteria(_) => println!("CRITERIA filter on {kind}"),
        Filter::IdentifierList(list) => {
            println!(
                "IDENTIFIER_LIST filter on {kind}: {} listed ids",
                list.equipments.len()
            );
        }
        Filter::Expert(expert) => {
            expert.validate()?;
            let nested = expert.rules.nested_filter_ids();
            println!(
                "EXPERT filter on {kind}: {} rules, {} nested filters",
                leaf_count(&expert.rules),
                nested.len()
            );
        }
        Filter::Script(_) => {
            println!("SCRIPT filter on {kind}: stored only, selections will be empty");
        }
    }
    if let Some(id) = id {
        println!("id: {id}");
    }
    println!("Filter is valid");
    Ok(())
}

fn leaf_count(rule: &ExpertRule) -> usize {
    match rule {
        ExpertRule::Combinator(combinator) => combinator.rules.iter().map(leaf_count).sum(),
        _ => 1,
    }
}
