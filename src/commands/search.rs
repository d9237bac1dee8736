use anyhow::Result;
use colored::*;

use bookfinder::search::SearchOutcome;
use bookfinder::{FilterCriteria, RetrievalMode, SearchError, SearchRequest, Services};

use super::render;

pub fn run(
    services: &Services,
    query: &str,
    limit: usize,
    fetch_multiplier: Option<usize>,
    similarity: bool,
    criteria: FilterCriteria,
    json: bool,
) -> Result<()> {
    let mode = if similarity {
        RetrievalMode::Similarity
    } else {
        RetrievalMode::Mmr
    };
    let request = SearchRequest::new(query, limit)
        .with_fetch_multiplier(
            fetch_multiplier.unwrap_or(services.settings.retrieval.fetch_multiplier),
        )
        .with_mode(mode);

    let outcome = match services.search.search(&request, &criteria, limit) {
        Ok(outcome) => outcome,
        Err(e @ SearchError::RetrievalUnavailable(_)) => {
            eprintln!(
                "{}",
                "Vector index unavailable; check the index backend and try again.".red()
            );
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(query, &criteria, &outcome);
    }
    Ok(())
}

fn print_outcome(query: &str, criteria: &FilterCriteria, outcome: &SearchOutcome) {
    println!("{}", "Search Results".bold());
    println!("{}", "=".repeat(60));
    println!("Query: \"{}\"", query);
    println!(
        "Retrieved: {}  Matched filters: {}",
        outcome.retrieved, outcome.matched
    );
    if outcome.dropped > 0 {
        println!(
            "{}",
            format!("{} malformed records skipped", outcome.dropped).yellow()
        );
    }
    println!();

    if outcome.records.is_empty() {
        if criteria.is_unbounded() {
            println!("{}", "No books found.".yellow());
        } else {
            println!("{}", "No books match these filters.".yellow());
        }
        return;
    }

    render::print_books(&outcome.records);
    render::print_more(outcome.matched, outcome.records.len());
}
