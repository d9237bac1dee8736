//! Local vector index using SQLite
//!
//! Stores embeddings as BLOBs and computes cosine similarity in Rust.
//! Brute force is fine for catalogs of a few tens of thousands of books.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::embedding::cosine_similarity;
use super::index::{
    Candidate, IndexDocument, IndexError, IndexInfo, IndexResult, Metadata, RetrievalHit,
    VectorIndex,
};

/// SQLite-backed vector index.
///
/// The connection is serialized behind a mutex so one index can be shared
/// by concurrent sessions. `close` drops it.
pub struct SqliteIndex {
    conn: Mutex<Option<Connection>>,
    location: PathBuf,
}

impl SqliteIndex {
    /// Open or create database at path
    pub fn open(db_path: &Path) -> IndexResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| IndexError::Connection(format!("{}: {}", parent.display(), e)))?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn, db_path.to_path_buf())
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> IndexResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, PathBuf::from(":memory:"))
    }

    fn with_connection(conn: Connection, location: PathBuf) -> IndexResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            location,
        })
    }

    fn lock(&self) -> IndexResult<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| IndexError::Connection("index lock poisoned".to_string()))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> IndexResult<T>) -> IndexResult<T> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(IndexError::Closed)?;
        f(conn)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> IndexResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO index_meta (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
    }

    pub fn get_meta(&self, key: &str) -> IndexResult<Option<String>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM index_meta WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }
}

fn init_schema(conn: &Connection) -> IndexResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            document TEXT NOT NULL,
            metadata TEXT NOT NULL,  -- JSON object
            indexed_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS embeddings (
            book_id TEXT PRIMARY KEY,
            embedding BLOB NOT NULL,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT
        );
        "#,
    )?;
    Ok(())
}

impl VectorIndex for SqliteIndex {
    fn candidates(&self, query: &[f32], fetch_k: usize) -> IndexResult<Vec<Candidate>> {
        if fetch_k == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, String, Vec<u8>)> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT b.document, b.metadata, e.embedding
                FROM books b
                JOIN embeddings e ON b.id = e.book_id
                ORDER BY b.rowid
                "#,
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut pool = Vec::with_capacity(rows.len());
        for (document, metadata_json, blob) in rows {
            let embedding = blob_to_embedding(&blob)?;
            if embedding.len() != query.len() {
                return Err(IndexError::Dimension {
                    expected: embedding.len(),
                    actual: query.len(),
                });
            }
            let metadata: Metadata = serde_json::from_str(&metadata_json)?;
            pool.push(Candidate {
                hit: RetrievalHit {
                    score: cosine_similarity(query, &embedding),
                    metadata,
                    document,
                },
                embedding,
            });
        }

        // stable: equal scores keep insertion order
        pool.sort_by(|a, b| b.hit.score.total_cmp(&a.hit.score));
        pool.truncate(fetch_k);
        Ok(pool)
    }

    fn add_documents(&self, docs: &[IndexDocument]) -> IndexResult<usize> {
        let mut guard = self.lock()?;
        let conn = guard.as_mut().ok_or(IndexError::Closed)?;
        let now = chrono::Utc::now().timestamp();

        let tx = conn.transaction()?;
        for doc in docs {
            let metadata_json = serde_json::to_string(&doc.metadata)?;
            tx.execute(
                r#"
                INSERT INTO books (id, document, metadata, indexed_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    document = excluded.document,
                    metadata = excluded.metadata,
                    indexed_at = excluded.indexed_at
                "#,
                params![doc.id, doc.document, metadata_json, now],
            )?;
            tx.execute(
                r#"
                INSERT INTO embeddings (book_id, embedding)
                VALUES (?1, ?2)
                ON CONFLICT(book_id) DO UPDATE SET embedding = excluded.embedding
                "#,
                params![doc.id, embedding_to_blob(&doc.embedding)],
            )?;
        }
        tx.commit()?;
        Ok(docs.len())
    }

    fn clear(&self) -> IndexResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch("DELETE FROM embeddings; DELETE FROM books;")?;
            Ok(())
        })
    }

    fn count(&self) -> IndexResult<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
            Ok(n as usize)
        })
    }

    fn describe(&self) -> IndexResult<IndexInfo> {
        Ok(IndexInfo {
            backend: "sqlite".to_string(),
            location: self.location.display().to_string(),
            documents: self.count()?,
            embedding_model: self.get_meta("embedding_model")?,
            last_indexed: self.get_meta("last_indexed")?,
            collections: Vec::new(),
        })
    }

    fn record_ingestion(&self, model: &str) -> IndexResult<()> {
        self.set_meta("embedding_model", model)?;
        self.set_meta("last_indexed", &chrono::Utc::now().to_rfc3339())
    }

    fn close(&self) -> IndexResult<()> {
        let conn = self.lock()?.take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| IndexError::Sqlite(e))?;
            tracing::debug!(path = %self.location.display(), "closed sqlite index");
        }
        Ok(())
    }
}

/// Convert f32 embedding to BLOB
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert BLOB to f32 embedding
fn blob_to_embedding(blob: &[u8]) -> IndexResult<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(IndexError::Malformed(format!(
            "embedding blob of {} bytes",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, title: &str, embedding: Vec<f32>) -> IndexDocument {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), json!(title));
        metadata.insert("price".to_string(), json!(9.5));
        IndexDocument {
            id: id.to_string(),
            document: format!("Title: {}", title),
            metadata,
            embedding,
        }
    }

    #[test]
    fn test_blob_conversion() {
        let embedding = vec![1.0, 2.0, 3.0, -0.5];
        let blob = embedding_to_blob(&embedding);
        assert_eq!(blob_to_embedding(&blob).unwrap(), embedding);
        assert!(blob_to_embedding(&blob[..3]).is_err());
    }

    #[test]
    fn test_add_and_query() -> IndexResult<()> {
        let index = SqliteIndex::open_in_memory()?;
        index.add_documents(&[
            doc("0", "Orthogonal", vec![0.0, 1.0]),
            doc("1", "Aligned", vec![1.0, 0.0]),
        ])?;
        assert_eq!(index.count()?, 2);

        let hits = index.similarity_search(&[1.0, 0.0], 1)?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata["title"], json!("Aligned"));
        assert_eq!(hits[0].metadata["price"], json!(9.5));
        assert_eq!(hits[0].document, "Title: Aligned");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_upsert_replaces_by_id() -> IndexResult<()> {
        let index = SqliteIndex::open_in_memory()?;
        index.add_documents(&[doc("0", "Old", vec![1.0, 0.0])])?;
        index.add_documents(&[doc("0", "New", vec![1.0, 0.0])])?;
        assert_eq!(index.count()?, 1);
        let hits = index.similarity_search(&[1.0, 0.0], 5)?;
        assert_eq!(hits[0].metadata["title"], json!("New"));
        Ok(())
    }

    #[test]
    fn test_dimension_mismatch() -> IndexResult<()> {
        let index = SqliteIndex::open_in_memory()?;
        index.add_documents(&[doc("0", "A", vec![1.0, 0.0, 0.0])])?;
        let err = index.similarity_search(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, IndexError::Dimension { expected: 3, actual: 2 }));
        Ok(())
    }

    #[test]
    fn test_clear_meta_and_describe() -> IndexResult<()> {
        let index = SqliteIndex::open_in_memory()?;
        index.add_documents(&[doc("0", "A", vec![1.0])])?;
        index.record_ingestion("htp")?;
        index.clear()?;

        let info = index.describe()?;
        assert_eq!(info.documents, 0);
        assert_eq!(info.backend, "sqlite");
        assert_eq!(info.embedding_model.as_deref(), Some("htp"));
        assert!(info.last_indexed.is_some());
        Ok(())
    }

    #[test]
    fn test_close_rejects_later_calls() -> IndexResult<()> {
        let index = SqliteIndex::open_in_memory()?;
        index.close()?;
        assert!(matches!(index.count(), Err(IndexError::Closed)));
        // closing twice is harmless
        index.close()?;
        Ok(())
    }

    #[test]
    fn test_open_on_disk_creates_parent() -> IndexResult<()> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/books.db");
        let index = SqliteIndex::open(&path)?;
        index.add_documents(&[doc("0", "A", vec![1.0])])?;
        index.close()?;

        let reopened = SqliteIndex::open(&path)?;
        assert_eq!(reopened.count()?, 1);
        Ok(())
    }
}
