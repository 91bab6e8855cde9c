//! Database schema definitions
//!
//! This module contains all SQL schema definitions for a session store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Fetch work queue, one row per (url, strategy) pair
CREATE TABLE IF NOT EXISTS PsiQueue (
    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    strategy TEXT NOT NULL,
    status TEXT NOT NULL,
    errormessage TEXT,
    report TEXT
);

CREATE INDEX IF NOT EXISTS idx_psiqueue_status ON PsiQueue(status);

-- URLs that are not eligible for analysis
CREATE TABLE IF NOT EXISTS IgnoreUrls (
    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    contenttype TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
