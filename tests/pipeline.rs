//! End-to-end: CSV catalog -> ingestion -> semantic search and browse

use std::io::Write;
use std::path::Path;

use bookfinder::config::{IndexBackend, RetrievalSettings};
use bookfinder::search::ingest::{ingest, IngestOptions};
use bookfinder::search::sqlite::SqliteIndex;
use bookfinder::search::{browse, VectorIndex};
use bookfinder::{FilterCriteria, SearchError, SearchRequest, Services, Settings};

const HEADER: &str = "Title,Authors,Description,Category,Publisher,Price Starting With ($),Publish Date (Month),Publish Date (Year)";

const BOOKS: &str = "\
Dragonflight,By Anne McCaffrey,Dragons and riders defend the planet Pern,Fiction,Del Rey,7.99,July,1968
The Hobbit,By J.R.R. Tolkien,A hobbit joins dwarves to reclaim treasure from a dragon,Fiction,Houghton Mifflin,9.50,September,1937.0
Dragon Economics,By John Smith,How myths of dragons shaped medieval trade,History,Penguin,24.00,March,2011
Rust in Action,By Tim McNamara,Systems programming with Rust,Computers,Manning,39.99,August,2021
Poems of Night,By Jane Smith,,Poetry,Penguin,5.00,May,1999
Broken Row,By Nobody,No price here,Fiction,Penguin,,May,2001
";

fn write_dataset(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("books.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    write!(file, "{}", BOOKS).unwrap();
    path
}

fn settings(dir: &Path) -> Settings {
    Settings {
        backend: IndexBackend::Local {
            path: dir.join("index").join("books.db"),
        },
        embedding_model: "htp".to_string(),
        dataset_path: Some(write_dataset(dir)),
        retrieval: RetrievalSettings::default(),
        sample_fraction: 1.0,
    }
}

fn indexed_services(dir: &Path) -> Services {
    let services = Services::init(settings(dir)).unwrap();
    let stats = ingest(
        services.catalog().unwrap(),
        services.embedder.as_ref(),
        services.index.as_ref(),
        IngestOptions::default(),
    )
    .unwrap();
    assert_eq!(stats.catalog_rows, 5);
    assert_eq!(stats.described, 4);
    assert_eq!(stats.indexed, 4);
    services
}

#[test]
fn search_then_filter_by_category() {
    let dir = tempfile::tempdir().unwrap();
    let services = indexed_services(dir.path());

    let outcome = services
        .search
        .search(
            &SearchRequest::new("a story about dragons", 10),
            &FilterCriteria::default().category("Fiction"),
            10,
        )
        .unwrap();

    assert_eq!(outcome.retrieved, 4);
    assert_eq!(outcome.dropped, 0);
    assert_eq!(outcome.matched, 2);
    let mut titles: Vec<_> = outcome.records.iter().map(|r| r.title.as_str()).collect();
    titles.sort();
    assert_eq!(titles, vec!["Dragonflight", "The Hobbit"]);
    // cleaned on load, so stored metadata never carries the prefix
    assert!(outcome.records.iter().all(|r| !r.authors.starts_with("By ")));

    services.shutdown().unwrap();
}

#[test]
fn search_results_are_distinct_and_capped() {
    let dir = tempfile::tempdir().unwrap();
    let services = indexed_services(dir.path());

    let outcome = services
        .search
        .search(&SearchRequest::new("dragon", 3), &FilterCriteria::default(), 2)
        .unwrap();

    assert_eq!(outcome.retrieved, 3);
    assert_eq!(outcome.matched, 3);
    assert_eq!(outcome.records.len(), 2);
    assert_ne!(outcome.records[0].title, outcome.records[1].title);
}

#[test]
fn invalid_request_is_rejected_before_retrieval() {
    let dir = tempfile::tempdir().unwrap();
    let services = indexed_services(dir.path());

    let err = services
        .search
        .search(&SearchRequest::new("   ", 5), &FilterCriteria::default(), 5)
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidRequest(_)));
    assert!(!err.is_retryable());

    let err = services
        .search
        .search(&SearchRequest::new("dragon", 0), &FilterCriteria::default(), 5)
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidRequest(_)));
}

#[test]
fn browse_reads_the_whole_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let services = Services::init(settings(dir.path())).unwrap();
    let catalog = services.catalog().unwrap();

    // browse sees undescribed books that search never indexes
    let outcome = browse(
        catalog.records(),
        &FilterCriteria::default().author("smith"),
        10,
    );
    assert_eq!(outcome.matched, 2);
    assert_eq!(outcome.records[0].authors, "John Smith");
    assert_eq!(outcome.records[1].title, "Poems of Night");

    let outcome = browse(
        catalog.records(),
        &FilterCriteria::default().publisher("Penguin").years(2000, 2024),
        10,
    );
    assert_eq!(outcome.matched, 1);
    assert_eq!(outcome.records[0].title, "Dragon Economics");

    let facets = catalog.facets();
    assert_eq!(facets.categories, vec!["Computers", "Fiction", "History", "Poetry"]);
    assert_eq!(facets.year.min, 1937);
    assert_eq!(facets.year.max, 2021);
}

#[test]
fn index_persists_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let services = indexed_services(dir.path());
    services.shutdown().unwrap();
    drop(services);

    let reopened = SqliteIndex::open(&dir.path().join("index").join("books.db")).unwrap();
    assert_eq!(reopened.count().unwrap(), 4);
    let info = reopened.describe().unwrap();
    assert_eq!(info.embedding_model.as_deref(), Some("htp"));
    assert!(info.last_indexed.is_some());
}
