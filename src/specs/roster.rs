//! Roster report (`RO`): dressed players per team. Starters are set in bold,
//! the captain and alternates carry `(C)` / `(A)` after their name.

use crate::error::SpecError;
use crate::extract::table::TableDef;
use crate::extract::{FieldSpec, Transform};
use crate::models::{TableType, ValueType};
use crate::schema::{ColumnSchema, Constraint, Schema};

use super::{NAME_PATTERN, POSITIONS};

const ROWS: &str = "table.roster tr:not(.heading)";

pub fn table_def() -> Result<TableDef, SpecError> {
    TableDef::new(
        TableType::Roster,
        ROWS,
        vec![
            FieldSpec::integer("number", "td:nth-child(1)"),
            FieldSpec::text("position", "td:nth-child(2)"),
            FieldSpec::text("name", "td:nth-child(3)").transform(Transform::StripMarkers),
            FieldSpec::boolean("starter", "td:nth-child(1)").transform(Transform::HasClass("bold")),
            FieldSpec::boolean("captain", "td:nth-child(3)").transform(Transform::Marker("(C)")),
            FieldSpec::boolean("alternate", "td:nth-child(3)").transform(Transform::Marker("(A)")),
        ],
    )
}

pub fn schema() -> Result<Schema, SpecError> {
    Ok(Schema::new(
        TableType::Roster,
        vec![
            ColumnSchema::new("number", ValueType::Integer).with(Constraint::Range { min: 0.0, max: 99.0 }),
            ColumnSchema::new("position", ValueType::Text).with(Constraint::OneOf(POSITIONS)),
            ColumnSchema::new("name", ValueType::Text).with(Constraint::pattern(NAME_PATTERN)?),
            ColumnSchema::new("starter", ValueType::Boolean),
            ColumnSchema::new("captain", ValueType::Boolean),
            ColumnSchema::new("alternate", ValueType::Boolean),
        ],
    ))
}
