//! Play-by-play report (`PL`): one row per game event.
//!
//! Event rows carry an id `PL-<n>`. The time cell stacks elapsed and
//! remaining period time on two lines: `5:10<br>14:50`. On-ice player
//! cells after the description are not extracted.

use crate::error::SpecError;
use crate::extract::table::TableDef;
use crate::extract::{FieldSpec, Transform};
use crate::models::{TableType, ValueType};
use crate::schema::{ColumnSchema, Constraint, Schema};

const ROWS: &str = "tr[id^='PL-']";

const STRENGTHS: &[&str] = &["EV", "PP", "SH"];

pub fn table_def() -> Result<TableDef, SpecError> {
    let clock = |name| FieldSpec::integer(name, "td:nth-child(4)").transform(Transform::Clock);

    TableDef::new(
        TableType::PlayByPlay,
        ROWS,
        vec![
            FieldSpec::integer("event_no", "td:nth-child(1)"),
            FieldSpec::integer("period", "td:nth-child(2)"),
            // Blank on period starts and stoppages.
            FieldSpec::text("strength", "td:nth-child(3)").placeholder("").optional(),
            clock("elapsed_seconds").line(0),
            clock("remaining_seconds").line(1),
            FieldSpec::text("event", "td:nth-child(5)"),
            FieldSpec::text("description", "td:nth-child(6)").placeholder("").optional(),
        ],
    )
}

pub fn schema() -> Result<Schema, SpecError> {
    let period_clock = |name| {
        ColumnSchema::new(name, ValueType::Integer).with(Constraint::Range { min: 0.0, max: 1200.0 })
    };

    Ok(Schema::new(
        TableType::PlayByPlay,
        vec![
            ColumnSchema::new("event_no", ValueType::Integer).with(Constraint::NonNegative),
            ColumnSchema::new("period", ValueType::Integer).with(Constraint::Range { min: 1.0, max: 20.0 }),
            ColumnSchema::new("strength", ValueType::Text)
                .nullable()
                .with(Constraint::OneOf(STRENGTHS)),
            period_clock("elapsed_seconds"),
            period_clock("remaining_seconds"),
            ColumnSchema::new("event", ValueType::Text).with(Constraint::pattern(r"^[A-Z]{2,6}$")?),
            ColumnSchema::new("description", ValueType::Text).nullable(),
        ],
    ))
}
