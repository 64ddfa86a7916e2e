use std::collections::HashSet;

use promptpack_utils::error::PackError;
use rusqlite::{Connection, params};
use tracing::{debug, trace};

use crate::query::match_expression;
use crate::scores::ScoreSheet;

/// In-memory full-text index over one corpus.
///
/// Backed by a private SQLite FTS5 table. The index owns its connection and
/// releases it when dropped, so an index lives exactly as long as the scope
/// that built it.
pub struct RelevanceIndex {
    conn: Connection,
    len: usize,
}

impl RelevanceIndex {
    /// Index `(id, content)` pairs.
    ///
    /// Fails with `SearchIndex` on duplicate ids or any SQLite error.
    pub fn build<'a, I>(documents: I) -> Result<Self, PackError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut conn = Connection::open_in_memory()
            .map_err(|e| PackError::search_index(format!("Failed to open index: {e}")))?;

        conn.execute_batch("CREATE VIRTUAL TABLE candidates USING fts5(id UNINDEXED, content);")
            .map_err(|e| PackError::search_index(format!("Failed to create index: {e}")))?;

        let mut seen = HashSet::new();
        let tx = conn
            .transaction()
            .map_err(|e| PackError::search_index(format!("Failed to begin indexing: {e}")))?;
        {
            let mut insert = tx
                .prepare("INSERT INTO candidates (id, content) VALUES (?1, ?2)")
                .map_err(PackError::search_index)?;

            for (id, content) in documents {
                if !seen.insert(id.to_string()) {
                    return Err(PackError::search_index(format!(
                        "Duplicate candidate id '{id}'"
                    )));
                }
                insert
                    .execute(params![id, content])
                    .map_err(|e| PackError::search_index(format!("Failed to index '{id}': {e}")))?;
                trace!(id = %id, bytes = content.len(), "Indexed candidate");
            }
        }
        tx.commit()
            .map_err(|e| PackError::search_index(format!("Failed to commit index: {e}")))?;

        debug!(documents = seen.len(), "Relevance index built");
        Ok(Self {
            conn,
            len: seen.len(),
        })
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Score every document matching any term of `query`.
    ///
    /// The score is the negated BM25 rank, so higher is more relevant.
    /// Documents that match nothing are absent from the sheet, and a query
    /// without searchable terms yields an empty sheet.
    pub fn search(&self, query: &str) -> Result<ScoreSheet, PackError> {
        let Some(expression) = match_expression(query) else {
            debug!(query = %query, "Query has no searchable terms");
            return Ok(ScoreSheet::new());
        };

        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT id, bm25(candidates) FROM candidates WHERE candidates MATCH ?1",
            )
            .map_err(PackError::search_index)?;

        let rows = stmt
            .query_map(params![expression], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })
            .map_err(|e| PackError::search_index(format!("Search failed: {e}")))?;

        let mut sheet = ScoreSheet::new();
        for row in rows {
            let (id, rank) = row.map_err(|e| PackError::search_index(format!("Search failed: {e}")))?;
            sheet.insert(id, -rank);
        }

        debug!(query = %query, hits = sheet.len(), "Search completed");
        Ok(sheet)
    }
}

impl std::fmt::Debug for RelevanceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevanceIndex")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl Drop for RelevanceIndex {
    fn drop(&mut self) {
        trace!(documents = self.len, "Releasing relevance index");
    }
}
