use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, Sqlite};
use tracing::{debug, info};

use super::domain::{Enquiry, EnquiryId, FollowUp, FollowUpId, Stage};
use super::query::{fold_case, SqlValue, Statement};

const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS enquiries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        student_name TEXT NOT NULL,
        class_applied TEXT NOT NULL,
        guardian_name TEXT NOT NULL,
        phone TEXT NOT NULL,
        source TEXT,
        stage TEXT NOT NULL DEFAULT 'new'
            CHECK (stage IN ('new', 'contacted', 'scheduled', 'admitted', 'lost')),
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        student_name_folded TEXT NOT NULL DEFAULT '',
        guardian_name_folded TEXT NOT NULL DEFAULT ''
    )",
    "CREATE INDEX IF NOT EXISTS idx_enquiries_created_at ON enquiries (created_at DESC, id DESC)",
    "CREATE INDEX IF NOT EXISTS idx_enquiries_stage_class ON enquiries (stage, class_applied)",
    "CREATE TABLE IF NOT EXISTS followups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        enquiry_id INTEGER NOT NULL REFERENCES enquiries (id),
        due_on TEXT NOT NULL,
        outcome TEXT,
        note TEXT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )",
    "CREATE INDEX IF NOT EXISTS idx_followups_enquiry_due ON followups (enquiry_id, due_on)",
];

/// Failures raised while talking to the enquiry store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid database url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored value for {column} is unreadable: {value}")]
    Corrupt { column: &'static str, value: String },
}

impl StoreError {
    pub(crate) fn is_foreign_key_violation(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(err)) => err.is_foreign_key_violation(),
            _ => false,
        }
    }
}

/// Relational store backing enquiries and follow-ups.
///
/// Exposes the four primitives the repositories need: insert returning an identity, point
/// lookup, ordered multi-row query, and count. Every call binds [`Statement::params`]
/// positionally.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|source| StoreError::InvalidUrl {
                url: url.to_string(),
                source,
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.migrate().await?;
        Ok(database)
    }

    /// Private database living for as long as the pool does.
    ///
    /// Each SQLite memory connection is its own database, so the pool is pinned to a single
    /// connection that is never reaped.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.migrate().await?;
        Ok(database)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        self.add_folded_name_columns().await
    }

    /// Stores created before search folding lack the folded name columns.
    async fn add_folded_name_columns(&self) -> Result<(), StoreError> {
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('enquiries')")
                .fetch_all(&self.pool)
                .await?;
        if columns.iter().any(|column| column == "student_name_folded") {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for column in ["student_name_folded", "guardian_name_folded"] {
            sqlx::query(&format!(
                "ALTER TABLE enquiries ADD COLUMN {column} TEXT NOT NULL DEFAULT ''"
            ))
            .execute(&mut *tx)
            .await?;
        }

        let rows = sqlx::query("SELECT id, student_name, guardian_name FROM enquiries")
            .fetch_all(&mut *tx)
            .await?;
        for row in &rows {
            let id: i64 = row.try_get("id")?;
            let student_name: String = row.try_get("student_name")?;
            let guardian_name: String = row.try_get("guardian_name")?;
            sqlx::query(
                "UPDATE enquiries SET student_name_folded = ?1, guardian_name_folded = ?2 \
                 WHERE id = ?3",
            )
            .bind(fold_case(&student_name))
            .bind(fold_case(&guardian_name))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(backfilled = rows.len(), "added folded name columns to enquiries");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run an `INSERT … RETURNING id`; `None` when the store produced no row.
    pub async fn insert_returning_id(&self, statement: &Statement) -> Result<Option<i64>, StoreError> {
        debug!(sql = %statement.sql, params = statement.params.len(), "insert");
        let row = bind(sqlx::query(&statement.sql), &statement.params)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| row.try_get::<i64, _>(0))
            .transpose()
            .map_err(StoreError::from)
    }

    pub async fn fetch_row(&self, statement: &Statement) -> Result<Option<SqliteRow>, StoreError> {
        debug!(sql = %statement.sql, params = statement.params.len(), "fetch row");
        let row = bind(sqlx::query(&statement.sql), &statement.params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<SqliteRow>, StoreError> {
        debug!(sql = %statement.sql, params = statement.params.len(), "fetch rows");
        let rows = bind(sqlx::query(&statement.sql), &statement.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count(&self, statement: &Statement) -> Result<i64, StoreError> {
        debug!(sql = %statement.sql, params = statement.params.len(), "count");
        let row = bind(sqlx::query(&statement.sql), &statement.params)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)?)
    }
}

fn bind<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Text(value) => query.bind(value.clone()),
            SqlValue::Integer(value) => query.bind(*value),
            SqlValue::Null => query.bind(None::<String>),
        };
    }
    query
}

fn parse_timestamp(column: &'static str, raw: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|stamp| stamp.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt { column, value: raw })
}

pub(crate) fn enquiry_from_row(row: &SqliteRow) -> Result<Enquiry, StoreError> {
    let stage: String = row.try_get("stage")?;
    let stage = stage
        .parse::<Stage>()
        .map_err(|_| StoreError::Corrupt {
            column: "stage",
            value: stage.clone(),
        })?;

    Ok(Enquiry {
        id: EnquiryId(row.try_get("id")?),
        student_name: row.try_get("student_name")?,
        class_applied: row.try_get("class_applied")?,
        guardian_name: row.try_get("guardian_name")?,
        phone: row.try_get("phone")?,
        source: row.try_get("source")?,
        stage,
        notes: row.try_get("notes")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

pub(crate) fn follow_up_from_row(row: &SqliteRow) -> Result<FollowUp, StoreError> {
    let due_on: String = row.try_get("due_on")?;
    let due_on = NaiveDate::parse_from_str(&due_on, "%Y-%m-%d").map_err(|_| StoreError::Corrupt {
        column: "due_on",
        value: due_on.clone(),
    })?;

    Ok(FollowUp {
        id: FollowUpId(row.try_get("id")?),
        enquiry_id: EnquiryId(row.try_get("enquiry_id")?),
        due_on,
        outcome: row.try_get("outcome")?,
        note: row.try_get("note")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let database = Database::in_memory().await.expect("database opens");
        database.migrate().await.expect("second migration succeeds");
    }

    #[tokio::test]
    async fn schema_rejects_stages_outside_pipeline() {
        let database = Database::in_memory().await.expect("database opens");
        let result = sqlx::query(
            "INSERT INTO enquiries (student_name, class_applied, guardian_name, phone, stage) \
             VALUES ('A', 'Grade 1', 'B', '5551234', 'archived')",
        )
        .execute(database.pool())
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn store_assigns_millisecond_timestamps() {
        let database = Database::in_memory().await.expect("database opens");
        let id = database
            .insert_returning_id(&Statement {
                sql: "INSERT INTO enquiries (student_name, class_applied, guardian_name, phone) \
                      VALUES (?1, ?2, ?3, ?4) RETURNING id"
                    .to_string(),
                params: vec![
                    SqlValue::Text("A".to_string()),
                    SqlValue::Text("Grade 1".to_string()),
                    SqlValue::Text("B".to_string()),
                    SqlValue::Text("5551234".to_string()),
                ],
            })
            .await
            .expect("insert succeeds")
            .expect("id returned");

        let row = database
            .fetch_row(&Statement {
                sql: "SELECT * FROM enquiries WHERE id = ?1".to_string(),
                params: vec![SqlValue::Integer(id)],
            })
            .await
            .expect("lookup succeeds")
            .expect("row present");
        let enquiry = enquiry_from_row(&row).expect("row decodes");
        assert_eq!(enquiry.stage, Stage::New);
        assert_eq!(enquiry.source, None);

        let raw: String = row.try_get("created_at").expect("created_at is text");
        let (_, fraction) = raw.rsplit_once('.').expect("fractional seconds present");
        assert_eq!(fraction.len(), 4, "expected .fffZ suffix in {raw}");
        assert!(fraction.ends_with('Z'));
        assert!(fraction[..3].chars().all(|ch| ch.is_ascii_digit()));
    }

    #[tokio::test]
    async fn migrate_backfills_folded_names_for_older_stores() {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").expect("url parses");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .expect("pool opens");
        sqlx::query(
            "CREATE TABLE enquiries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_name TEXT NOT NULL,
                class_applied TEXT NOT NULL,
                guardian_name TEXT NOT NULL,
                phone TEXT NOT NULL,
                source TEXT,
                stage TEXT NOT NULL DEFAULT 'new',
                notes TEXT,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&pool)
        .await
        .expect("legacy table created");
        sqlx::query(
            "INSERT INTO enquiries (student_name, class_applied, guardian_name, phone) \
             VALUES ('Zoë Martin', 'Grade 1', 'ÉLODIE Martin', '5551234')",
        )
        .execute(&pool)
        .await
        .expect("legacy row inserted");

        let database = Database { pool };
        database.migrate().await.expect("migration succeeds");
        database.migrate().await.expect("second migration succeeds");

        let (student, guardian): (String, String) = sqlx::query_as(
            "SELECT student_name_folded, guardian_name_folded FROM enquiries",
        )
        .fetch_one(database.pool())
        .await
        .expect("folded columns readable");
        assert_eq!(student, "zoë martin");
        assert_eq!(guardian, "élodie martin");
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let database = Database::in_memory().await.expect("database opens");
        let err = sqlx::query("INSERT INTO followups (enquiry_id, due_on) VALUES (404, '2024-06-01')")
            .execute(database.pool())
            .await
            .map_err(StoreError::from)
            .expect_err("orphan follow-up rejected");
        assert!(err.is_foreign_key_violation());
    }
}
