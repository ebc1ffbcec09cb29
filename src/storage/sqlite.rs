//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ScrapeStore trait.

use crate::state::ScrapeStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ScrapeStore, StorageError, StorageResult};
use crate::storage::{now_millis, RecordFilter, ScrapeRecord, StoredRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;

const RECORD_COLUMNS: &str = "id, url, title, description, content, metadata, images, links,
     scraped_at, status, error, created_at, updated_at";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::debug!("Opened database at {}", path.display());
        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl ScrapeStore for SqliteStore {
    fn find_by_url(&self, url: &str) -> StorageResult<Option<StoredRecord>> {
        let sql = format!("SELECT {} FROM scrape_records WHERE url = ?1", RECORD_COLUMNS);
        let record = self
            .conn
            .query_row(&sql, params![url], row_to_record)
            .optional()?;
        Ok(record)
    }

    fn get_record(&self, id: i64) -> StorageResult<StoredRecord> {
        let sql = format!("SELECT {} FROM scrape_records WHERE id = ?1", RECORD_COLUMNS);
        self.conn
            .query_row(&sql, params![id], row_to_record)
            .optional()?
            .ok_or(StorageError::RecordNotFound(id))
    }

    fn insert_record(&mut self, record: &ScrapeRecord) -> StorageResult<StoredRecord> {
        let now = to_db_timestamp(&now_millis());
        let fields = EncodedFields::encode(record)?;

        self.conn
            .execute(
                "INSERT INTO scrape_records
                 (url, title, description, content, metadata, images, links,
                  scraped_at, status, error, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    record.url,
                    record.title,
                    record.description,
                    record.content,
                    fields.metadata,
                    fields.images,
                    fields.links,
                    fields.scraped_at,
                    record.status.to_db_string(),
                    record.error,
                    now,
                ],
            )
            .map_err(|e| map_constraint(e, &record.url))?;

        self.get_record(self.conn.last_insert_rowid())
    }

    fn update_record(&mut self, id: i64, record: &ScrapeRecord) -> StorageResult<StoredRecord> {
        let now = to_db_timestamp(&now_millis());
        let fields = EncodedFields::encode(record)?;

        let changed = self
            .conn
            .execute(
                "UPDATE scrape_records SET url = ?1, title = ?2, description = ?3, content = ?4,
                 metadata = ?5, images = ?6, links = ?7, scraped_at = ?8, status = ?9,
                 error = ?10, updated_at = ?11
                 WHERE id = ?12",
                params![
                    record.url,
                    record.title,
                    record.description,
                    record.content,
                    fields.metadata,
                    fields.images,
                    fields.links,
                    fields.scraped_at,
                    record.status.to_db_string(),
                    record.error,
                    now,
                    id,
                ],
            )
            .map_err(|e| map_constraint(e, &record.url))?;

        if changed == 0 {
            return Err(StorageError::RecordNotFound(id));
        }

        self.get_record(id)
    }

    fn count_records(&self, filter: &RecordFilter) -> StorageResult<u64> {
        let count: i64 = match filter {
            RecordFilter::All => {
                self.conn
                    .query_row("SELECT COUNT(*) FROM scrape_records", [], |row| row.get(0))?
            }
            RecordFilter::Status(status) => self.conn.query_row(
                "SELECT COUNT(*) FROM scrape_records WHERE status = ?1",
                params![status.to_db_string()],
                |row| row.get(0),
            )?,
            RecordFilter::ScrapedSince(since) => self.conn.query_row(
                "SELECT COUNT(*) FROM scrape_records WHERE scraped_at >= ?1",
                params![to_db_timestamp(since)],
                |row| row.get(0),
            )?,
        };
        Ok(count as u64)
    }

    fn list_records(&self, url: Option<&str>, limit: usize) -> StorageResult<Vec<StoredRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let records = match url {
            Some(url) => {
                let sql = format!(
                    "SELECT {} FROM scrape_records WHERE url = ?1
                     ORDER BY scraped_at DESC, id DESC LIMIT ?2",
                    RECORD_COLUMNS
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map(params![url, limit], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM scrape_records ORDER BY scraped_at DESC, id DESC LIMIT ?1",
                    RECORD_COLUMNS
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map(params![limit], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(records)
    }
}

/// JSON and timestamp columns of a record, ready to bind
struct EncodedFields {
    metadata: Option<String>,
    images: Option<String>,
    links: Option<String>,
    scraped_at: String,
}

impl EncodedFields {
    fn encode(record: &ScrapeRecord) -> StorageResult<Self> {
        Ok(Self {
            metadata: record.metadata.as_ref().map(serde_json::to_string).transpose()?,
            images: record.images.as_ref().map(serde_json::to_string).transpose()?,
            links: record.links.as_ref().map(serde_json::to_string).transpose()?,
            scraped_at: to_db_timestamp(&record.scraped_at),
        })
    }
}

/// Formats a timestamp so that text order matches chronological order
fn to_db_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_json<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    let status_text: String = row.get(9)?;
    let status = ScrapeStatus::from_db_string(&status_text).unwrap_or(ScrapeStatus::Failed);

    Ok(StoredRecord {
        id: row.get(0)?,
        created_at: parse_timestamp(row, 11)?,
        updated_at: parse_timestamp(row, 12)?,
        record: ScrapeRecord {
            url: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            content: row.get(4)?,
            metadata: parse_json(row, 5)?,
            images: parse_json(row, 6)?,
            links: parse_json(row, 7)?,
            scraped_at: parse_timestamp(row, 8)?,
            status,
            error: row.get(10)?,
        },
    })
}

/// Converts a UNIQUE violation into a storage-level constraint error
fn map_constraint(err: rusqlite::Error, url: &str) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _) if code.code == ErrorCode::ConstraintViolation => {
            StorageError::ConstraintViolation(format!("record for {} already exists", url))
        }
        _ => StorageError::Sqlite(err),
    }
}
