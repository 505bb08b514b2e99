//! Table builder: one record per repeating unit of a page.

use crate::error::{ExtractionError, SpecError, TableError};
use crate::models::{Record, Table, TableType};
use crate::scraper::parsers::{compile_selector, HtmlDocument, Node};
use scraper::Selector;
use std::collections::HashSet;
use tracing::debug;

use super::{extract_field, CompiledField, FieldSpec};

/// Row selector plus per-row field specs for one table type.
#[derive(Debug, Clone)]
pub struct TableDef {
    table_type: TableType,
    row_selector_src: &'static str,
    row_selector: Selector,
    fields: Vec<CompiledField>,
}

impl TableDef {
    pub fn new(
        table_type: TableType,
        row_selector: &'static str,
        fields: Vec<FieldSpec>,
    ) -> Result<Self, SpecError> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(fields.len());
        for spec in fields {
            if !seen.insert(spec.name) {
                return Err(SpecError::DuplicateField {
                    table: table_type,
                    field: spec.name.to_string(),
                });
            }
            compiled.push(CompiledField::compile(table_type, spec)?);
        }

        Ok(Self {
            table_type,
            row_selector_src: row_selector,
            row_selector: compile_selector(&format!("{}.rows", table_type), row_selector)?,
            fields: compiled,
        })
    }

    pub fn table_type(&self) -> TableType {
        self.table_type
    }

    /// Output columns, in definition order.
    pub fn columns(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name().to_string()).collect()
    }
}

/// How many failed rows a page may carry before it is unusable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowTolerance {
    pub max_failed_ratio: f64,
}

impl Default for RowTolerance {
    fn default() -> Self {
        Self {
            max_failed_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub row_index: usize,
    pub error: ExtractionError,
}

#[derive(Debug, Clone)]
pub struct BuiltTable {
    pub table: Table,
    pub failures: Vec<RowFailure>,
}

/// Run every field of `def` against one row. Stops at the first bad field.
pub fn extract_row(row: &Node<'_>, def: &TableDef) -> Result<Record, ExtractionError> {
    let fields = def
        .fields
        .iter()
        .map(|f| extract_field(row, f))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Record::from(fields))
}

pub fn build_table(
    doc: &HtmlDocument,
    def: &TableDef,
    unit_id: &str,
    tolerance: RowTolerance,
) -> Result<BuiltTable, TableError> {
    let rows = doc.root().select(&def.row_selector);
    if rows.is_empty() {
        return Err(TableError::NoRows {
            table: def.table_type,
            selector: def.row_selector_src.to_string(),
        });
    }

    let mut table = Table::new(def.table_type, unit_id, def.columns());
    let mut failures = Vec::new();

    for (row_index, row) in rows.iter().enumerate() {
        match extract_row(row, def) {
            Ok(record) => table.records.push(record),
            Err(error) => {
                debug!("{} {} row {}: {}", def.table_type, unit_id, row_index, error);
                failures.push(RowFailure { row_index, error });
            }
        }
    }

    finish_table(table, failures, rows.len(), tolerance)
}

/// Apply the page-level rules to `total` extracted rows: reject the table when
/// none survived or when the failed share exceeds the tolerance.
pub fn finish_table(
    table: Table,
    mut failures: Vec<RowFailure>,
    total: usize,
    tolerance: RowTolerance,
) -> Result<BuiltTable, TableError> {
    if table.records.is_empty() && !failures.is_empty() {
        let first = failures.swap_remove(0).error;
        return Err(TableError::AllRowsFailed {
            table: table.table_type,
            rows: total,
            first,
        });
    }

    if failures.len() as f64 / total as f64 > tolerance.max_failed_ratio {
        return Err(TableError::TooManyRowFailures {
            table: table.table_type,
            failed: failures.len(),
            total,
            max_ratio: tolerance.max_failed_ratio,
        });
    }

    Ok(BuiltTable { table, failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Transform;
    use crate::models::{RawDocument, Value};

    fn def() -> TableDef {
        TableDef::new(
            TableType::Skaters,
            "tr.evenColor, tr.oddColor",
            vec![
                FieldSpec::integer("number", "td:nth-child(1)"),
                FieldSpec::text("name", "td:nth-child(2)"),
                FieldSpec::integer("toi_seconds", "td:nth-child(3)").transform(Transform::Clock),
            ],
        )
        .unwrap()
    }

    fn page(rows: &[(&str, &str, &str)]) -> HtmlDocument {
        let body: String = rows
            .iter()
            .enumerate()
            .map(|(i, (n, name, toi))| {
                let class = if i % 2 == 0 { "evenColor" } else { "oddColor" };
                format!(r#"<tr class="{class}"><td>{n}</td><td>{name}</td><td>{toi}</td></tr>"#)
            })
            .collect();
        let html = format!("<html><body><table><tr><td>#</td></tr>{body}</table></body></html>");
        HtmlDocument::parse(RawDocument::new("https://example.test/ES020001.HTM", html)).unwrap()
    }

    #[test]
    fn test_all_rows_well_formed() {
        let doc = page(&[("87", "SIDNEY CROSBY", "20:01"), ("71", "EVGENI MALKIN", "18:12")]);
        let built = build_table(&doc, &def(), "2021020001", RowTolerance::default()).unwrap();
        assert_eq!(built.table.len(), 2);
        assert!(built.failures.is_empty());
        assert_eq!(built.table.records[1].get("toi_seconds"), Some(&Value::Integer(1092)));
    }

    #[test]
    fn test_partial_failure_keeps_good_rows() {
        let doc = page(&[
            ("87", "SIDNEY CROSBY", "20:01"),
            ("—", "EVGENI MALKIN", "18:12"),
            ("58", "KRIS LETANG", "25:40"),
            ("59", "JAKE GUENTZEL", "bad"),
            ("17", "BRYAN RUST", "16:05"),
        ]);
        let built = build_table(&doc, &def(), "2021020001", RowTolerance::default()).unwrap();
        assert_eq!(built.table.len(), 3);
        assert_eq!(built.failures.len(), 2);
        assert_eq!(built.failures[0].row_index, 1);
        assert_eq!(built.failures[0].error.field(), "number");
        assert_eq!(built.failures[1].row_index, 3);
        assert_eq!(built.failures[1].error.field(), "toi_seconds");
    }

    #[test]
    fn test_total_failure_is_a_table_error() {
        let doc = page(&[("x", "A", "1:00"), ("y", "B", "2:00")]);
        let err = build_table(&doc, &def(), "2021020001", RowTolerance::default()).unwrap_err();
        assert!(matches!(err, TableError::AllRowsFailed { rows: 2, .. }));
    }

    #[test]
    fn test_no_rows_is_a_table_error() {
        let doc = page(&[]);
        let err = build_table(&doc, &def(), "2021020001", RowTolerance::default()).unwrap_err();
        assert!(matches!(err, TableError::NoRows { .. }));
    }

    #[test]
    fn test_tolerance_threshold() {
        let doc = page(&[("87", "A", "1:00"), ("x", "B", "2:00"), ("71", "C", "3:00")]);
        let strict = RowTolerance { max_failed_ratio: 0.25 };
        let err = build_table(&doc, &def(), "2021020001", strict).unwrap_err();
        assert!(matches!(err, TableError::TooManyRowFailures { failed: 1, total: 3, .. }));

        let lenient = RowTolerance { max_failed_ratio: 0.5 };
        assert!(build_table(&doc, &def(), "2021020001", lenient).is_ok());
    }

    #[test]
    fn test_columns_stable_across_row_counts() {
        let one = page(&[("87", "A", "1:00")]);
        let many = page(&[("87", "A", "1:00"), ("71", "B", "2:00"), ("x", "C", "3:00")]);
        let a = build_table(&one, &def(), "1", RowTolerance::default()).unwrap();
        let b = build_table(&many, &def(), "2", RowTolerance::default()).unwrap();
        assert_eq!(a.table.columns, b.table.columns);
        assert_eq!(a.table.columns, vec!["number", "name", "toi_seconds"]);
        for record in a.table.records.iter().chain(&b.table.records) {
            assert_eq!(record.columns().collect::<Vec<_>>(), a.table.columns);
        }
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = TableDef::new(
            TableType::Roster,
            "tr",
            vec![FieldSpec::integer("number", "td"), FieldSpec::integer("number", "td")],
        )
        .unwrap_err();
        assert!(matches!(err, SpecError::DuplicateField { .. }));
    }
}
