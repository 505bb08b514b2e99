//! Field specs and schemas for every table type, built once at startup.

pub mod play_by_play;
pub mod roster;
pub mod shifts;
pub mod skaters;

use crate::error::SpecError;
use crate::extract::table::TableDef;
use crate::models::TableType;
use crate::schema::{Schema, SchemaCatalog};
use std::collections::HashMap;

pub(crate) const POSITIONS: &[&str] = &["C", "L", "R", "D", "G"];

/// Report names are upper case, possibly "LAST, FIRST", with accents,
/// hyphens, apostrophes and initials.
pub(crate) const NAME_PATTERN: &str = r"^\p{Lu}[\p{Lu}\p{M} .,'\-]*$";

/// How a table type's records are produced from a fetched page.
#[derive(Debug, Clone)]
pub enum TableSource {
    /// Field specs over the rows of an HTML report.
    Html(TableDef),
    /// Entries of the shift chart JSON.
    ShiftChart,
}

impl TableSource {
    pub fn columns(&self) -> Vec<String> {
        match self {
            Self::Html(def) => def.columns(),
            Self::ShiftChart => shifts::columns(),
        }
    }
}

pub struct Catalog {
    sources: HashMap<TableType, TableSource>,
    schemas: SchemaCatalog,
}

impl Catalog {
    pub fn standard() -> Result<Self, SpecError> {
        let mut sources = HashMap::new();
        let mut schemas = SchemaCatalog::new();

        for table_type in TableType::ALL {
            let (source, schema) = match table_type {
                TableType::Skaters => (TableSource::Html(skaters::table_def()?), skaters::schema()?),
                TableType::Roster => (TableSource::Html(roster::table_def()?), roster::schema()?),
                TableType::PlayByPlay => (TableSource::Html(play_by_play::table_def()?), play_by_play::schema()?),
                TableType::Shifts => (TableSource::ShiftChart, shifts::schema()?),
            };
            sources.insert(table_type, source);
            schemas.insert(schema);
        }

        Ok(Self { sources, schemas })
    }

    pub fn source(&self, table_type: TableType) -> Option<&TableSource> {
        self.sources.get(&table_type)
    }

    pub fn schema(&self, table_type: TableType) -> Option<&Schema> {
        self.schemas.get(table_type)
    }
}
