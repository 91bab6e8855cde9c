//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the QueueStore trait.

use crate::state::{ItemStatus, Strategy};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{QueueStore, StorageError, StorageResult};
use crate::storage::{IgnoreEntry, NewIgnoreEntry, NewQueueItem, QueueFilter, QueueItem};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// SQLite's "no limit" value for LIMIT clauses
const NO_LIMIT: i64 = -1;

const SELECT_WITH_REPORT: &str = "SELECT id, url, strategy, status, errormessage, report
     FROM PsiQueue
     WHERE (?1 IS NULL OR status = ?1)
     ORDER BY id ASC
     LIMIT ?2";

const SELECT_WITHOUT_REPORT: &str = "SELECT id, url, strategy, status, errormessage, NULL
     FROM PsiQueue
     WHERE (?1 IS NULL OR status = ?1)
     ORDER BY id ASC
     LIMIT ?2";

/// SQLite session store
pub struct SqliteQueueStore {
    conn: Option<Connection>,
}

impl SqliteQueueStore {
    /// Opens or creates a session store at the given path
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteQueueStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database or create the schema
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::debug!("Opened session store at {}", path.display());
        Ok(Self { conn: Some(conn) })
    }

    /// Creates an in-memory store, used by tests and dry runs
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn: Some(conn) })
    }

    /// Returns true once `close` has been called
    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    fn conn(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or(StorageError::Closed)
    }

    fn conn_mut(&mut self) -> StorageResult<&mut Connection> {
        self.conn.as_mut().ok_or(StorageError::Closed)
    }

    fn query_items(
        &self,
        status: Option<ItemStatus>,
        limit: Option<usize>,
        include_report: bool,
    ) -> StorageResult<Vec<QueueItem>> {
        let sql = if include_report {
            SELECT_WITH_REPORT
        } else {
            SELECT_WITHOUT_REPORT
        };
        let limit = limit.map(|l| l as i64).unwrap_or(NO_LIMIT);

        let mut stmt = self.conn()?.prepare(sql)?;
        let items = stmt
            .query_map(
                params![status.map(|s| s.to_db_string()), limit],
                queue_item_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }
}

/// Maps a PsiQueue row (id, url, strategy, status, errormessage, report)
fn queue_item_from_row(row: &Row<'_>) -> rusqlite::Result<QueueItem> {
    let strategy: String = row.get(2)?;
    let status: String = row.get(3)?;
    let report: Option<String> = row.get(5)?;

    let report = report
        .map(|text| serde_json::from_str::<Value>(&text))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(QueueItem {
        id: row.get(0)?,
        url: row.get(1)?,
        strategy: Strategy::from_db_string(&strategy)
            .ok_or_else(|| conversion_error(2, format!("unknown strategy '{}'", strategy)))?,
        status: ItemStatus::from_db_string(&status)
            .ok_or_else(|| conversion_error(3, format!("unknown status '{}'", status)))?,
        error_message: row.get(4)?,
        report,
    })
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

impl QueueStore for SqliteQueueStore {
    // ===== Queue Management =====

    fn enqueue(&mut self, items: &[NewQueueItem]) -> StorageResult<()> {
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO PsiQueue (url, strategy, status) VALUES (?1, ?2, ?3)",
            )?;
            for item in items {
                insert.execute(params![
                    item.url,
                    item.strategy.as_str(),
                    ItemStatus::Queued.to_db_string()
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Enqueued {} items", items.len());
        Ok(())
    }

    fn next_batch(&self, status: ItemStatus, limit: usize) -> StorageResult<Vec<QueueItem>> {
        self.query_items(Some(status), Some(limit), false)
    }

    fn update_status(
        &mut self,
        id: i64,
        status: ItemStatus,
        error_message: Option<&str>,
        report: Option<&Value>,
    ) -> StorageResult<()> {
        if id <= 0 {
            return Err(StorageError::InvalidArgument(format!(
                "id must be a positive key, got {}",
                id
            )));
        }

        let report = report.map(serde_json::to_string).transpose()?;

        let updated = self.conn()?.execute(
            "UPDATE PsiQueue SET status = ?1, errormessage = ?2, report = ?3 WHERE id = ?4",
            params![status.to_db_string(), error_message, report, id],
        )?;

        if updated == 0 {
            return Err(StorageError::NotFound(id));
        }
        Ok(())
    }

    fn requeue_status(&mut self, from: ItemStatus, to: ItemStatus) -> StorageResult<usize> {
        let moved = self.conn()?.execute(
            "UPDATE PsiQueue SET status = ?1 WHERE status = ?2",
            params![to.to_db_string(), from.to_db_string()],
        )?;
        Ok(moved)
    }

    fn all_items(&self, filter: &QueueFilter) -> StorageResult<Vec<QueueItem>> {
        self.query_items(filter.status, filter.limit, filter.include_report)
    }

    // ===== Ignore List =====

    fn add_ignore_entries(&mut self, entries: &[NewIgnoreEntry]) -> StorageResult<()> {
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO IgnoreUrls (url, status, contenttype) VALUES (?1, ?2, ?3)",
            )?;
            for entry in entries {
                insert.execute(params![entry.url, entry.http_status, entry.content_type])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Added {} ignore entries", entries.len());
        Ok(())
    }

    fn ignore_entries(&self, limit: Option<usize>) -> StorageResult<Vec<IgnoreEntry>> {
        let limit = limit.map(|l| l as i64).unwrap_or(NO_LIMIT);
        let mut stmt = self.conn()?.prepare(
            "SELECT id, url, status, contenttype FROM IgnoreUrls ORDER BY id ASC LIMIT ?1",
        )?;

        let entries = stmt
            .query_map(params![limit], |row| {
                Ok(IgnoreEntry {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    http_status: row.get(2)?,
                    content_type: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    // ===== Statistics =====

    fn count_by_status(&self) -> StorageResult<HashMap<ItemStatus, u64>> {
        let mut stmt = self
            .conn()?
            .prepare("SELECT status, COUNT(*) FROM PsiQueue GROUP BY status")?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        for row in rows {
            let (status, count) = row?;
            match ItemStatus::from_db_string(&status) {
                Some(status) => {
                    counts.insert(status, count as u64);
                }
                None => tracing::warn!("Ignoring {} rows with unknown status '{}'", count, status),
            }
        }

        Ok(counts)
    }

    fn count_ignored(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM IgnoreUrls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Lifecycle =====

    fn close(&mut self) -> StorageResult<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| StorageError::Fault(e)),
            None => Err(StorageError::Closed),
        }
    }
}
