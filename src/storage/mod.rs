use crate::error::ExtractionErrorKind;
use crate::models::{Table, TableType, Value, ValueType};
use crate::pipeline::{BatchReport, BatchSummary};
use crate::schema::Schema;
use anyhow::{Context, Result};
use chrono::Utc;
use duckdb::types::{ToSqlOutput, Value as DbValue};
use duckdb::{params, Connection, ToSql};
use std::path::Path;
use tracing::{debug, info};

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS seq_scrape_runs START 1;

CREATE TABLE IF NOT EXISTS scrape_runs (
    id              BIGINT PRIMARY KEY DEFAULT nextval('seq_scrape_runs'),
    command         VARCHAR NOT NULL,
    table_type      VARCHAR NOT NULL,
    started_at      TIMESTAMP NOT NULL,
    finished_at     TIMESTAMP,
    status          VARCHAR NOT NULL DEFAULT 'running',
    succeeded       INTEGER DEFAULT 0,
    partial         INTEGER DEFAULT 0,
    failed          INTEGER DEFAULT 0,
    cancelled       INTEGER DEFAULT 0,
    error_msg       VARCHAR
);

CREATE TABLE IF NOT EXISTS unit_failures (
    run_id      BIGINT  NOT NULL,
    unit_id     VARCHAR NOT NULL,
    url         VARCHAR NOT NULL,
    kind        VARCHAR NOT NULL,
    message     VARCHAR NOT NULL,
    recorded_at TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS row_failures (
    run_id      BIGINT  NOT NULL,
    table_type  VARCHAR NOT NULL,
    unit_id     VARCHAR NOT NULL,
    row_index   INTEGER NOT NULL,
    field       VARCHAR NOT NULL,
    kind        VARCHAR NOT NULL,
    message     VARCHAR NOT NULL
);

-- row_index is NULL for table-level violations
CREATE TABLE IF NOT EXISTS violations (
    run_id      BIGINT  NOT NULL,
    table_type  VARCHAR NOT NULL,
    unit_id     VARCHAR NOT NULL,
    row_index   INTEGER,
    column_name VARCHAR NOT NULL,
    expected    VARCHAR NOT NULL,
    actual      VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

/// Columns added after the first release.
const UPGRADES: &str = r#"
ALTER TABLE scrape_runs ADD COLUMN IF NOT EXISTS aborted INTEGER DEFAULT 0;
"#;

/// Latest `schema_version`.
const SCHEMA_VERSION: i64 = 2;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_unit_failures_run ON unit_failures (run_id);
CREATE INDEX IF NOT EXISTS idx_row_failures_unit ON row_failures (unit_id);
CREATE INDEX IF NOT EXISTS idx_violations_unit   ON violations (unit_id);
"#;

fn sql_type(ty: ValueType) -> &'static str {
    match ty {
        ValueType::Integer => "BIGINT",
        ValueType::Float => "DOUBLE",
        ValueType::Text => "VARCHAR",
        ValueType::Boolean => "BOOLEAN",
    }
}

/// One table per table type: `unit_id`, `record_no`, then the schema columns.
/// Nullability is enforced by validation, not here, so lenient runs can store
/// non-conforming rows.
fn table_ddl(schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("    \"{}\" {}", c.name, sql_type(c.ty)))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    unit_id VARCHAR NOT NULL,\n    record_no INTEGER NOT NULL,\n{},\n    scraped_at TIMESTAMP NOT NULL,\n    PRIMARY KEY (unit_id, record_no)\n);",
        schema.table_type,
        columns.join(",\n")
    )
}

impl ToSql for Value {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(match self {
            Value::Integer(i) => DbValue::BigInt(*i),
            Value::Float(f) => DbValue::Double(*f),
            Value::Text(s) => DbValue::Text(s.clone()),
            Value::Boolean(b) => DbValue::Boolean(*b),
            Value::Null => DbValue::Null,
        }))
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TableStats {
    pub table_type: TableType,
    pub rows: i64,
    pub units: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageStats {
    pub tables: Vec<TableStats>,
    pub runs: i64,
    pub unit_failures: i64,
    pub violations: i64,
}

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", path))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        self.conn.execute_batch(DDL).context("DDL failed")?;
        self.conn.execute_batch(UPGRADES).context("Schema upgrade failed")?;
        self.conn.execute_batch(INDEXES).context("Index creation failed")?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, ?)",
            params![SCHEMA_VERSION, Utc::now().naive_utc()],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    // ── Tables ────────────────────────────────────────────────────────────────

    /// Replace everything stored for `table.unit_id`. Re-running a unit
    /// leaves one copy of its rows.
    pub fn store_table(&self, table: &Table, schema: &Schema) -> Result<usize> {
        self.conn
            .execute_batch(&table_ddl(schema))
            .with_context(|| format!("create table {}", schema.table_type))?;

        let columns: Vec<String> = schema.columns.iter().map(|c| format!("\"{}\"", c.name)).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} (unit_id, record_no, {}, scraped_at) VALUES (?, ?, {}, ?)",
            schema.table_type,
            columns.join(", "),
            placeholders
        );

        let now = Utc::now().naive_utc();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!("DELETE FROM {} WHERE unit_id = ?", schema.table_type),
            params![table.unit_id],
        )?;

        {
            let mut stmt = tx.prepare(&sql)?;
            for (i, record) in table.records.iter().enumerate() {
                let record_no = i as i64;
                let mut values: Vec<&dyn ToSql> = vec![&table.unit_id, &record_no];
                for column in &schema.columns {
                    values.push(record.get(column.name).unwrap_or(&Value::Null));
                }
                values.push(&now);
                stmt.execute(values.as_slice())
                    .with_context(|| format!("insert {} {} #{}", schema.table_type, table.unit_id, i))?;
            }
        }

        tx.commit()?;
        debug!("{} {}: {} rows stored", schema.table_type, table.unit_id, table.len());
        Ok(table.len())
    }

    pub fn row_count(&self, table_type: TableType) -> Result<i64> {
        if !self.table_exists(table_type.as_str())? {
            return Ok(0);
        }
        let mut s = self.conn.prepare(&format!("SELECT COUNT(*) FROM {}", table_type))?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    fn unit_count(&self, table_type: TableType) -> Result<i64> {
        if !self.table_exists(table_type.as_str())? {
            return Ok(0);
        }
        let mut s = self
            .conn
            .prepare(&format!("SELECT COUNT(DISTINCT unit_id) FROM {}", table_type))?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            params![name],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    fn count(&self, table: &str) -> Result<i64> {
        let mut s = self.conn.prepare(&format!("SELECT COUNT(*) FROM {}", table))?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn stats(&self) -> Result<StorageStats> {
        let mut tables = Vec::new();
        for table_type in TableType::ALL {
            tables.push(TableStats {
                table_type,
                rows: self.row_count(table_type)?,
                units: self.unit_count(table_type)?,
            });
        }
        Ok(StorageStats {
            tables,
            runs: self.count("scrape_runs")?,
            unit_failures: self.count("unit_failures")?,
            violations: self.count("violations")?,
        })
    }

    // ── Batch results ─────────────────────────────────────────────────────────

    /// Store every produced table and log failures and violations under `run_id`.
    pub fn record_batch(&self, run_id: i64, report: &BatchReport, schema: &Schema) -> Result<usize> {
        let now = Utc::now().naive_utc();
        let table_type = schema.table_type.as_str();
        let mut stored = 0;

        for outcome in &report.outcomes {
            let unit = &outcome.unit;
            match &outcome.result {
                Err(e) => {
                    self.conn.execute(
                        r#"INSERT INTO unit_failures (run_id, unit_id, url, kind, message, recorded_at)
                           VALUES (?, ?, ?, ?, ?, ?)"#,
                        params![run_id, unit.id, unit.url, e.kind().as_str(), e.to_string(), now],
                    )?;
                }
                Ok(unit_report) => {
                    stored += self.store_table(&unit_report.table, schema)?;

                    let tx = self.conn.unchecked_transaction()?;
                    for failure in &unit_report.extraction_failures {
                        let kind = match failure.error.kind() {
                            ExtractionErrorKind::NotFound => "not-found",
                            ExtractionErrorKind::CoercionFailure => "coercion-failure",
                        };
                        tx.execute(
                            r#"INSERT INTO row_failures
                                   (run_id, table_type, unit_id, row_index, field, kind, message)
                               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
                            params![
                                run_id,
                                table_type,
                                unit.id,
                                failure.row_index as i64,
                                failure.error.field(),
                                kind,
                                failure.error.to_string(),
                            ],
                        )?;
                    }
                    for v in &unit_report.violations {
                        tx.execute(
                            r#"INSERT INTO violations
                                   (run_id, table_type, unit_id, row_index, column_name, expected, actual)
                               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
                            params![
                                run_id,
                                table_type,
                                unit.id,
                                v.row_index.map(|i| i as i64),
                                v.column,
                                v.expected,
                                v.actual,
                            ],
                        )?;
                    }
                    tx.commit()?;
                }
            }
        }

        for aborted in &report.aborted {
            self.conn.execute(
                r#"INSERT INTO unit_failures (run_id, unit_id, url, kind, message, recorded_at)
                   VALUES (?, ?, ?, 'aborted', ?, ?)"#,
                params![run_id, aborted.unit.id, aborted.unit.url, aborted.message, now],
            )?;
        }

        Ok(stored)
    }

    // ── Scrape run log ────────────────────────────────────────────────────────

    pub fn begin_scrape_run(&self, command: &str, table_type: TableType) -> Result<i64> {
        let id: i64 = self.conn.query_row(
            r#"INSERT INTO scrape_runs (command, table_type, started_at, status)
               VALUES (?, ?, ?, 'running') RETURNING id"#,
            params![command, table_type.as_str(), Utc::now().naive_utc()],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    pub fn finish_scrape_run(&self, run_id: i64, summary: &BatchSummary, error: Option<&str>) -> Result<()> {
        let status = if error.is_some() {
            "error"
        } else if summary.cancelled > 0 {
            "cancelled"
        } else if summary.aborted > 0 {
            "aborted"
        } else {
            "success"
        };
        self.conn.execute(
            r#"UPDATE scrape_runs SET
               finished_at = ?, status = ?,
               succeeded = ?, partial = ?, failed = ?, cancelled = ?, aborted = ?, error_msg = ?
               WHERE id = ?"#,
            params![
                Utc::now().naive_utc(),
                status,
                summary.succeeded as i64,
                summary.partial as i64,
                summary.failed as i64,
                summary.cancelled as i64,
                summary.aborted as i64,
                error,
                run_id,
            ],
        )?;
        Ok(())
    }
}
