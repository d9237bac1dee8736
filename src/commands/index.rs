use anyhow::{bail, Result};
use colored::*;

use bookfinder::search::ingest::{ingest, IngestOptions};
use bookfinder::Services;

pub fn run(
    services: &Services,
    rebuild: bool,
    sample_fraction: Option<f64>,
    json: bool,
) -> Result<()> {
    let sample_fraction = sample_fraction.unwrap_or(services.settings.sample_fraction);
    if !(sample_fraction > 0.0 && sample_fraction <= 1.0) {
        bail!("--sample-fraction must be in (0, 1], got {}", sample_fraction);
    }

    let catalog = services.catalog()?;
    if !json {
        println!(
            "{} {} ({} books)",
            "Indexing".bold(),
            catalog.path().display(),
            catalog.len()
        );
    }

    let stats = ingest(
        catalog,
        services.embedder.as_ref(),
        services.index.as_ref(),
        IngestOptions {
            sample_fraction,
            rebuild,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("   {:<22} {:>7}", "Catalog rows", stats.catalog_rows);
    println!("   {:<22} {:>7}", "With description", stats.described);
    println!("   {:<22} {:>7}", "Indexed", stats.indexed);
    if catalog.skipped_rows() > 0 {
        println!("   {:<22} {:>7}", "Unreadable rows", catalog.skipped_rows());
    }
    println!();
    println!(
        "{}",
        format!(
            "Done in {:.1}s with {}",
            stats.duration_ms as f64 / 1000.0,
            services.embedder.model_name()
        )
        .green()
    );
    Ok(())
}
