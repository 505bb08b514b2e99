//! Shift charts from the stats REST API: one row per player shift.
//!
//! The endpoint answers `{"data": [...]}` with shift times as period clocks
//! (`"MM:SS"`). Goal events are interleaved with the shifts and carry no
//! duration; they are skipped. Rows are normalised to game seconds:
//! - a third-period shift with no end that started in the last two minutes
//!   ends at `20:00`;
//! - a missing start is `end - duration`, a missing end `start + duration`;
//! - a shift ending before it started crossed the period break.

use crate::error::{ExtractionError, ParseError, SpecError, TableError};
use crate::extract::table::{finish_table, BuiltTable, RowFailure, RowTolerance};
use crate::models::{RawDocument, Record, Table, TableType, Value, ValueType};
use crate::schema::{ColumnSchema, Constraint, Schema};
use crate::scraper::cleaner::parse_clock;
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::debug;

pub const COLUMNS: [&str; 7] = [
    "player_id",
    "team_id",
    "team_name",
    "period",
    "start_seconds",
    "end_seconds",
    "duration_seconds",
];

const PERIOD_SECONDS: i64 = 1200;

const LATE_START_SECONDS: i64 = 18 * 60;

#[derive(Debug, Deserialize)]
struct ShiftChartBody {
    data: Vec<Json>,
}

/// Decoded shift chart entries of one game, not yet checked.
#[derive(Debug)]
pub struct ShiftChart {
    entries: Vec<Json>,
}

impl ShiftChart {
    pub fn parse(raw: &RawDocument) -> Result<Self, ParseError> {
        let body: ShiftChartBody = serde_json::from_str(raw.body()).map_err(|e| ParseError::Unparseable {
            url: raw.url().to_string(),
            reason: format!("invalid shift chart JSON: {}", e),
        })?;
        Ok(Self { entries: body.data })
    }

    pub fn build_table(&self, unit_id: &str, tolerance: RowTolerance) -> Result<BuiltTable, TableError> {
        let mut table = Table::new(TableType::Shifts, unit_id, columns());
        let mut failures = Vec::new();
        let mut total = 0;

        for (row_index, entry) in self.entries.iter().enumerate() {
            if is_goal_marker(entry) {
                continue;
            }
            total += 1;
            match shift_record(entry) {
                Ok(record) => table.records.push(record),
                Err(error) => {
                    debug!("shifts {} entry {}: {}", unit_id, row_index, error);
                    failures.push(RowFailure { row_index, error });
                }
            }
        }

        if total == 0 {
            return Err(TableError::NoRows {
                table: TableType::Shifts,
                selector: "data[]".to_string(),
            });
        }
        finish_table(table, failures, total, tolerance)
    }
}

pub fn columns() -> Vec<String> {
    COLUMNS.iter().map(|c| c.to_string()).collect()
}

pub fn schema() -> Result<Schema, SpecError> {
    let seconds = |name| ColumnSchema::new(name, ValueType::Integer).with(Constraint::NonNegative);

    Ok(Schema::new(
        TableType::Shifts,
        vec![
            ColumnSchema::new("player_id", ValueType::Integer).with(Constraint::NonNegative),
            ColumnSchema::new("team_id", ValueType::Integer).with(Constraint::NonNegative),
            ColumnSchema::new("team_name", ValueType::Text),
            ColumnSchema::new("period", ValueType::Integer).with(Constraint::Range { min: 1.0, max: 20.0 }),
            seconds("start_seconds"),
            seconds("end_seconds"),
            ColumnSchema::new("duration_seconds", ValueType::Integer)
                .with(Constraint::Range { min: 0.0, max: PERIOD_SECONDS as f64 }),
        ],
    ))
}

fn is_goal_marker(entry: &Json) -> bool {
    entry.get("duration").is_none_or(Json::is_null)
}

fn shift_record(entry: &Json) -> Result<Record, ExtractionError> {
    let player_id = int_field(entry, "playerId", "player_id")?;
    let team_id = int_field(entry, "teamId", "team_id")?;
    let team_name = text_field(entry, "teamName", "team_name")?;
    let period = int_field(entry, "period", "period")?;
    if period < 1 {
        return Err(coercion_failure("period", period.to_string(), "period must start at 1"));
    }

    let start = clock_field(entry, "startTime", "start_seconds")?;
    let end = clock_field(entry, "endTime", "end_seconds")?;
    let duration = clock_field(entry, "duration", "duration_seconds")?;
    let (start, end, duration) = game_seconds(period, start, end, duration)?;

    let mut record = Record::new();
    record.push("player_id", Value::Integer(player_id));
    record.push("team_id", Value::Integer(team_id));
    record.push("team_name", Value::Text(team_name));
    record.push("period", Value::Integer(period));
    record.push("start_seconds", Value::Integer(start));
    record.push("end_seconds", Value::Integer(end));
    record.push("duration_seconds", Value::Integer(duration));
    Ok(record)
}

/// Fill in missing period clocks, then turn them into seconds since the
/// opening faceoff. Returns `(start, end, end - start)`.
fn game_seconds(
    period: i64,
    start: Option<i64>,
    end: Option<i64>,
    duration: Option<i64>,
) -> Result<(i64, i64, i64), ExtractionError> {
    let end = match (end, start) {
        (None, Some(s)) if period == 3 && s >= LATE_START_SECONDS => Some(PERIOD_SECONDS),
        _ => end,
    };
    let start = start.or_else(|| end?.checked_sub(duration?));
    let end = end.or_else(|| start?.checked_add(duration?));

    let start = start.ok_or_else(|| not_found("start_seconds", "startTime"))?;
    let end = end.ok_or_else(|| not_found("end_seconds", "endTime"))?;

    let out_of_range = || coercion_failure("period", period.to_string(), "period out of range");
    let offset = (period - 1).checked_mul(PERIOD_SECONDS).ok_or_else(out_of_range)?;
    let start = start.checked_add(offset).ok_or_else(out_of_range)?;
    let mut end = end.checked_add(offset).ok_or_else(out_of_range)?;
    if end < start {
        end = end.checked_add(PERIOD_SECONDS).ok_or_else(out_of_range)?;
    }
    let duration = end.checked_sub(start).ok_or_else(out_of_range)?;
    Ok((start, end, duration))
}

// ── Entry fields ──────────────────────────────────────────────────────────────

fn present<'a>(entry: &'a Json, key: &str) -> Option<&'a Json> {
    entry.get(key).filter(|v| !v.is_null())
}

fn int_field(entry: &Json, key: &str, column: &str) -> Result<i64, ExtractionError> {
    let value = present(entry, key).ok_or_else(|| not_found(column, key))?;
    value.as_i64().ok_or_else(|| ExtractionError::CoercionFailure {
        field: column.to_string(),
        text: value.to_string(),
        expected: ValueType::Integer,
        reason: "not an integer".to_string(),
    })
}

fn text_field(entry: &Json, key: &str, column: &str) -> Result<String, ExtractionError> {
    let value = present(entry, key).ok_or_else(|| not_found(column, key))?;
    match value.as_str().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ExtractionError::CoercionFailure {
            field: column.to_string(),
            text: value.to_string(),
            expected: ValueType::Text,
            reason: "empty text".to_string(),
        }),
    }
}

/// A period clock. `null` and `""` mean "not recorded".
fn clock_field(entry: &Json, key: &str, column: &str) -> Result<Option<i64>, ExtractionError> {
    let Some(value) = present(entry, key) else {
        return Ok(None);
    };
    let Some(text) = value.as_str() else {
        return Err(coercion_failure(column, value.to_string(), "clock must be a string"));
    };
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_clock(text)
        .map(Some)
        .map_err(|reason| coercion_failure(column, text.to_string(), &reason))
}

fn not_found(column: &str, key: &str) -> ExtractionError {
    ExtractionError::NotFound {
        field: column.to_string(),
        selector: key.to_string(),
    }
}

fn coercion_failure(column: &str, text: String, reason: &str) -> ExtractionError {
    ExtractionError::CoercionFailure {
        field: column.to_string(),
        text,
        expected: ValueType::Integer,
        reason: reason.to_string(),
    }
}
