use anyhow::Result;
use colored::*;

use bookfinder::search::browse;
use bookfinder::{CatalogFacets, FilterCriteria, Services};

use super::render;

pub fn run(services: &Services, limit: usize, criteria: FilterCriteria, json: bool) -> Result<()> {
    let catalog = services.catalog()?;
    let outcome = browse(catalog.records(), &criteria, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("{}", "Browse".bold());
    println!("{}", "=".repeat(60));
    println!(
        "Showing {} of {} matching books ({} total)",
        outcome.records.len(),
        outcome.matched,
        catalog.len()
    );
    println!();

    if outcome.records.is_empty() {
        println!("{}", "No books match these filters.".yellow());
    } else {
        render::print_books(&outcome.records);
        render::print_more(outcome.matched, outcome.records.len());
    }
    Ok(())
}

pub fn facets(services: &Services, json: bool) -> Result<()> {
    let facets = services.catalog()?.facets();

    if json {
        println!("{}", serde_json::to_string_pretty(&facets)?);
    } else {
        print_facets(&facets);
    }
    Ok(())
}

fn print_facets(facets: &CatalogFacets) {
    println!("{}", "Dataset Facets".bold());
    println!("{}", "=".repeat(50));
    println!(
        "Price: {:.2} - {:.2}",
        facets.price.min, facets.price.max
    );
    println!("Year:  {} - {}", facets.year.min, facets.year.max);
    println!();

    print_list("Categories", &facets.categories);
    print_list("Publishers", &facets.publishers);
}

fn print_list(title: &str, values: &[String]) {
    println!("{} ({})", title.cyan(), values.len());
    println!("{}", "-".repeat(30));
    for v in values {
        println!("   {}", v);
    }
    println!();
}
