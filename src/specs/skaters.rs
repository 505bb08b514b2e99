//! Event summary report (`ES`): one stat line per dressed player.
//!
//! Column layout of the report rows:
//! `# | POS | NAME | G | A | P | +/- | PN | PIM | TOT | SHF | AVG | PP | SH |
//! EV | S | A/B | MS | HT | GV | TK | BS | FW | FL | F%`

use crate::error::SpecError;
use crate::extract::table::TableDef;
use crate::extract::{FieldSpec, Transform};
use crate::models::{TableType, ValueType};
use crate::schema::{ColumnSchema, Constraint, Schema};

use super::{NAME_PATTERN, POSITIONS};

const ROWS: &str = "tr.evenColor, tr.oddColor";

pub fn table_def() -> Result<TableDef, SpecError> {
    TableDef::new(
        TableType::Skaters,
        ROWS,
        vec![
            FieldSpec::integer("number", "td:nth-child(1)"),
            FieldSpec::text("position", "td:nth-child(2)"),
            FieldSpec::text("name", "td:nth-child(3)"),
            FieldSpec::integer("goals", "td:nth-child(4)"),
            FieldSpec::integer("assists", "td:nth-child(5)"),
            FieldSpec::integer("points", "td:nth-child(6)"),
            // Blank for goaltenders.
            FieldSpec::integer("plus_minus", "td:nth-child(7)").placeholder("").optional(),
            FieldSpec::integer("penalties", "td:nth-child(8)"),
            FieldSpec::integer("pim", "td:nth-child(9)"),
            FieldSpec::integer("toi_seconds", "td:nth-child(10)").transform(Transform::Clock),
            FieldSpec::integer("shifts", "td:nth-child(11)"),
            FieldSpec::integer("shots", "td:nth-child(16)").placeholder("").optional(),
            FieldSpec::integer("hits", "td:nth-child(19)").placeholder("").optional(),
            FieldSpec::integer("blocked_shots", "td:nth-child(22)").placeholder("").optional(),
            FieldSpec::float("faceoff_pct", "td:nth-child(25)")
                .transform(Transform::Percent)
                .placeholder("")
                .optional(),
        ],
    )
}

pub fn schema() -> Result<Schema, SpecError> {
    let count = |name| ColumnSchema::new(name, ValueType::Integer).with(Constraint::NonNegative);

    Ok(Schema::new(
        TableType::Skaters,
        vec![
            ColumnSchema::new("number", ValueType::Integer).with(Constraint::Range { min: 0.0, max: 99.0 }),
            ColumnSchema::new("position", ValueType::Text).with(Constraint::OneOf(POSITIONS)),
            ColumnSchema::new("name", ValueType::Text).with(Constraint::pattern(NAME_PATTERN)?),
            count("goals"),
            count("assists"),
            count("points"),
            ColumnSchema::new("plus_minus", ValueType::Integer).nullable(),
            count("penalties"),
            count("pim"),
            count("toi_seconds"),
            count("shifts"),
            count("shots").nullable(),
            count("hits").nullable(),
            count("blocked_shots").nullable(),
            ColumnSchema::new("faceoff_pct", ValueType::Float)
                .nullable()
                .with(Constraint::Range { min: 0.0, max: 100.0 }),
        ],
    ))
}
