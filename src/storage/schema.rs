//! Database schema definitions
//!
//! This module contains the SQL schema for the Sumi-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per normalized URL; rescrapes update the row in place
CREATE TABLE IF NOT EXISTS scrape_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT,
    description TEXT,
    content TEXT,
    metadata TEXT,
    images TEXT,
    links TEXT,
    scraped_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'success'
        CHECK (status IN ('success', 'failed', 'partial')),
    error TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_title ON scrape_records(title);
CREATE INDEX IF NOT EXISTS idx_records_scraped_at ON scrape_records(scraped_at);
CREATE INDEX IF NOT EXISTS idx_records_url_scraped ON scrape_records(url, scraped_at DESC);
CREATE INDEX IF NOT EXISTS idx_records_status_scraped ON scrape_records(status, scraped_at DESC);
"#;

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Reads the schema version recorded in the database
#[cfg(test)]
fn get_schema_version(conn: &rusqlite::Connection) -> Result<u32, rusqlite::Error> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}
