use anyhow::{bail, Result};
use chrono::Local;
use colored::*;
use serde::Serialize;

use bookfinder::search::index::IndexInfo;
use bookfinder::Services;

#[derive(Serialize)]
struct ServiceStatus {
    timestamp: String,
    embedding_model: String,
    dimension: usize,
    index: Option<IndexInfo>,
    index_error: Option<String>,
    catalog: Option<CatalogStatus>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct CatalogStatus {
    path: String,
    rows: usize,
    described: usize,
    skipped: usize,
}

pub fn run(services: &Services, json: bool) -> Result<()> {
    let (index, index_error) = match services.index.describe() {
        Ok(info) => (Some(info), None),
        Err(e) => (None, Some(e.to_string())),
    };

    let catalog = services.catalog().ok().map(|c| CatalogStatus {
        path: c.path().display().to_string(),
        rows: c.len(),
        described: c.described_count(),
        skipped: c.skipped_rows(),
    });

    let mut warnings = Vec::new();
    if let Some(err) = &index_error {
        warnings.push(format!("index unreachable: {}", err));
    }
    if let Some(info) = &index {
        if info.documents == 0 {
            warnings.push("index is empty; run `bookfinder index`".to_string());
        }
        if let Some(model) = &info.embedding_model {
            if model != services.embedder.model_name() {
                warnings.push(format!(
                    "index built with '{}' but configured model is '{}'",
                    model,
                    services.embedder.model_name()
                ));
            }
        }
        if let Some(c) = &catalog {
            if info.documents > 0 && info.documents < c.described {
                warnings.push(format!(
                    "only {} of {} described books are indexed",
                    info.documents, c.described
                ));
            }
        }
    }
    if catalog.is_none() {
        warnings.push("DATASET_PATH not set; browse and indexing unavailable".to_string());
    }

    let status = ServiceStatus {
        timestamp: Local::now().to_rfc3339(),
        embedding_model: services.embedder.model_name().to_string(),
        dimension: services.embedder.dimension(),
        index,
        index_error,
        catalog,
        warnings,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }

    if status.index_error.is_some() {
        bail!("vector index unavailable");
    }
    Ok(())
}

fn print_status(status: &ServiceStatus) {
    println!("{}", "Bookfinder Status".bold());
    println!("{}", "=".repeat(50));
    println!();
    println!("Checked: {}", status.timestamp);
    println!("Model:   {} ({} dims)", status.embedding_model, status.dimension);
    println!();

    println!("{}", "Vector index".cyan());
    println!("{}", "-".repeat(30));
    match &status.index {
        Some(info) => {
            println!("   {:<14} {}", "Backend", info.backend);
            println!("   {:<14} {}", "Location", info.location);
            println!("   {:<14} {}", "Documents", info.documents);
            if let Some(model) = &info.embedding_model {
                println!("   {:<14} {}", "Built with", model);
            }
            if let Some(at) = &info.last_indexed {
                println!("   {:<14} {}", "Last indexed", at);
            }
            if !info.collections.is_empty() {
                println!("   {:<14} {}", "Collections", info.collections.join(", "));
            }
        }
        None => println!("   {}", "unavailable".red()),
    }
    println!();

    if let Some(c) = &status.catalog {
        println!("{}", "Catalog".cyan());
        println!("{}", "-".repeat(30));
        println!("   {:<14} {}", "Path", c.path);
        println!("   {:<14} {}", "Rows", c.rows);
        println!("   {:<14} {}", "Described", c.described);
        if c.skipped > 0 {
            println!("   {:<14} {}", "Skipped", c.skipped);
        }
        println!();
    }

    if !status.warnings.is_empty() {
        println!("{}", "Warnings".yellow());
        println!("{}", "-".repeat(30));
        for w in &status.warnings {
            println!("   {}", w);
        }
    }
}
