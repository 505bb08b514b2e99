//! Declared table contracts and the validator that checks tables against them.
//!
//! Validation is a predicate plus a report: it never coerces or fixes values.
//! Every violation in a table is collected in one pass.

use crate::error::SpecError;
use crate::models::{Table, TableType, Value, ValueType};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

// ── Schema ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Constraint {
    NonNegative,
    /// Inclusive bounds.
    Range { min: f64, max: f64 },
    OneOf(&'static [&'static str]),
    Pattern(Regex),
}

impl Constraint {
    pub fn pattern(pattern: &str) -> Result<Self, SpecError> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|e| SpecError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    fn holds(&self, value: &Value) -> bool {
        match self {
            Self::NonNegative => value.as_f64().is_some_and(|v| v >= 0.0),
            Self::Range { min, max } => value.as_f64().is_some_and(|v| v >= *min && v <= *max),
            Self::OneOf(allowed) => value.as_str().is_some_and(|s| allowed.contains(&s)),
            Self::Pattern(re) => value.as_str().is_some_and(|s| re.is_match(s)),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonNegative => f.write_str("non-negative"),
            Self::Range { min, max } => write!(f, "within [{}, {}]", min, max),
            Self::OneOf(allowed) => write!(f, "one of {}", allowed.join("|")),
            Self::Pattern(re) => write!(f, "matching /{}/", re.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub name: &'static str,
    pub ty: ValueType,
    pub nullable: bool,
    pub constraints: Vec<Constraint>,
}

impl ColumnSchema {
    pub fn new(name: &'static str, ty: ValueType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            constraints: Vec::new(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub table_type: TableType,
    pub columns: Vec<ColumnSchema>,
}

impl Schema {
    pub fn new(table_type: TableType, columns: Vec<ColumnSchema>) -> Self {
        Self { table_type, columns }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}

/// Explicit table-type → schema mapping, built once and handed to callers.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: HashMap<TableType, Schema>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, schema: Schema) {
        self.schemas.insert(schema.table_type, schema);
    }

    pub fn get(&self, table_type: TableType) -> Option<&Schema> {
        self.schemas.get(&table_type)
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub column: String,
    /// `None` for table-level problems such as a missing column.
    pub row_index: Option<usize>,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row_index {
            Some(row) => write!(f, "row {}, column '{}'", row, self.column)?,
            None => write!(f, "column '{}'", self.column)?,
        }
        write!(f, ": expected {}, got {}", self.expected, self.actual)
    }
}

#[derive(Debug, Clone)]
pub enum ValidationResult {
    Conforming(Table),
    NonConforming {
        table: Table,
        violations: Vec<Violation>,
        description: String,
    },
}

impl ValidationResult {
    pub fn is_conforming(&self) -> bool {
        matches!(self, Self::Conforming(_))
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Conforming(_) => &[],
            Self::NonConforming { violations, .. } => violations,
        }
    }

    pub fn into_parts(self) -> (Table, Vec<Violation>) {
        match self {
            Self::Conforming(table) => (table, Vec::new()),
            Self::NonConforming {
                table, violations, ..
            } => (table, violations),
        }
    }
}

pub fn validate(table: Table, schema: &Schema) -> ValidationResult {
    let mut violations = Vec::new();

    if table.table_type != schema.table_type {
        violations.push(Violation {
            column: "*".to_string(),
            row_index: None,
            expected: format!("{} table", schema.table_type),
            actual: format!("{} table", table.table_type),
        });
    }

    check_column_set(&table.columns, schema, None, &mut violations);

    for (row_index, record) in table.records.iter().enumerate() {
        let record_columns: Vec<String> = record.columns().map(str::to_string).collect();
        if record_columns != table.columns {
            check_column_set(&record_columns, schema, Some(row_index), &mut violations);
        }

        for column in &schema.columns {
            if let Some(value) = record.get(column.name) {
                check_value(column, value, row_index, &mut violations);
            }
        }
    }

    if violations.is_empty() {
        return ValidationResult::Conforming(table);
    }

    let description = describe(&table, &violations);
    ValidationResult::NonConforming {
        table,
        violations,
        description,
    }
}

fn check_column_set(
    columns: &[String],
    schema: &Schema,
    row_index: Option<usize>,
    out: &mut Vec<Violation>,
) {
    let present: BTreeSet<&str> = columns.iter().map(String::as_str).collect();
    for declared in &schema.columns {
        if !present.contains(declared.name) {
            out.push(Violation {
                column: declared.name.to_string(),
                row_index,
                expected: "column present".to_string(),
                actual: "missing".to_string(),
            });
        }
    }
    for name in present {
        if schema.column(name).is_none() {
            out.push(Violation {
                column: name.to_string(),
                row_index,
                expected: "no such column".to_string(),
                actual: "unexpected column".to_string(),
            });
        }
    }
}

fn check_value(column: &ColumnSchema, value: &Value, row_index: usize, out: &mut Vec<Violation>) {
    let mut push = |expected: String| {
        out.push(Violation {
            column: column.name.to_string(),
            row_index: Some(row_index),
            expected,
            actual: actual_repr(value),
        })
    };

    match value.value_type() {
        None if column.nullable => {}
        None => push(format!("non-null {}", column.ty)),
        Some(ty) if ty != column.ty => push(column.ty.to_string()),
        Some(_) => {
            for constraint in &column.constraints {
                if !constraint.holds(value) {
                    push(format!("{} {}", constraint, column.ty));
                }
            }
        }
    }
}

fn actual_repr(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Text(s) => format!("{:?}", s),
        other => format!("{} ({})", other, other.type_name()),
    }
}

fn describe(table: &Table, violations: &[Violation]) -> String {
    let columns: BTreeSet<&str> = violations.iter().map(|v| v.column.as_str()).collect();
    let rows: BTreeSet<usize> = violations.iter().filter_map(|v| v.row_index).collect();
    format!(
        "{} {}: {} violation(s) across {} row(s) in column(s) {}",
        table.table_type,
        table.unit_id,
        violations.len(),
        rows.len(),
        columns.into_iter().collect::<Vec<_>>().join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    fn schema() -> Schema {
        Schema::new(
            TableType::Skaters,
            vec![
                ColumnSchema::new("name", ValueType::Text),
                ColumnSchema::new("position", ValueType::Text).with(Constraint::OneOf(&["C", "L", "R", "D", "G"])),
                ColumnSchema::new("goals", ValueType::Integer).with(Constraint::NonNegative),
                ColumnSchema::new("fo_pct", ValueType::Float)
                    .nullable()
                    .with(Constraint::Range { min: 0.0, max: 100.0 }),
            ],
        )
    }

    fn record(name: &str, position: &str, goals: i64, fo_pct: Value) -> Record {
        let mut r = Record::new();
        r.push("name", Value::Text(name.into()));
        r.push("position", Value::Text(position.into()));
        r.push("goals", Value::Integer(goals));
        r.push("fo_pct", fo_pct);
        r
    }

    fn table(records: Vec<Record>) -> Table {
        let mut t = Table::new(
            TableType::Skaters,
            "2021020001",
            vec!["name".into(), "position".into(), "goals".into(), "fo_pct".into()],
        );
        t.records = records;
        t
    }

    #[test]
    fn test_conforming_table_passes_unchanged() {
        let t = table(vec![
            record("SIDNEY CROSBY", "C", 2, Value::Float(55.0)),
            record("KRIS LETANG", "D", 0, Value::Null),
        ]);
        let expected = t.clone();
        match validate(t, &schema()) {
            ValidationResult::Conforming(out) => assert_eq!(out, expected),
            other => panic!("expected conforming, got {:?}", other.violations()),
        }
    }

    #[test]
    fn test_negative_goals_reported_once() {
        let t = table(vec![
            record("SIDNEY CROSBY", "C", 2, Value::Null),
            record("EVGENI MALKIN", "C", -1, Value::Null),
        ]);
        let result = validate(t, &schema());
        assert!(!result.is_conforming());
        assert_eq!(
            result.violations(),
            &[Violation {
                column: "goals".into(),
                row_index: Some(1),
                expected: "non-negative integer".into(),
                actual: "-1 (integer)".into(),
            }]
        );
        let (table, _) = result.into_parts();
        assert_eq!(table.records[1].get("goals"), Some(&Value::Integer(-1)));
    }

    #[test]
    fn test_collects_every_violation() {
        let t = table(vec![
            record("A", "X", -3, Value::Float(120.0)),
            record("B", "C", 1, Value::Text("50".into())),
        ]);
        let result = validate(t, &schema());
        let found: Vec<(&str, Option<usize>)> = result
            .violations()
            .iter()
            .map(|v| (v.column.as_str(), v.row_index))
            .collect();
        assert_eq!(
            found,
            vec![
                ("position", Some(0)),
                ("goals", Some(0)),
                ("fo_pct", Some(0)),
                ("fo_pct", Some(1)),
            ]
        );
        match result {
            ValidationResult::NonConforming { description, .. } => {
                assert!(description.contains("4 violation(s)"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_column_set_is_order_independent_but_exact() {
        let mut t = table(vec![]);
        t.columns = vec!["fo_pct".into(), "goals".into(), "position".into(), "name".into()];
        assert!(validate(t, &schema()).is_conforming());

        let mut t = table(vec![]);
        t.columns = vec!["name".into(), "position".into(), "goals".into(), "hits".into()];
        let result = validate(t, &schema());
        let cols: Vec<&str> = result.violations().iter().map(|v| v.column.as_str()).collect();
        assert_eq!(cols, vec!["fo_pct", "hits"]);
    }

    #[test]
    fn test_null_in_required_column() {
        let mut r = Record::new();
        r.push("name", Value::Null);
        r.push("position", Value::Text("C".into()));
        r.push("goals", Value::Integer(0));
        r.push("fo_pct", Value::Null);
        let result = validate(table(vec![r]), &schema());
        assert_eq!(result.violations().len(), 1);
        assert_eq!(result.violations()[0].expected, "non-null text");
        assert_eq!(result.violations()[0].actual, "null");
    }

    #[test]
    fn test_pattern_constraint() {
        let schema = Schema::new(
            TableType::Roster,
            vec![ColumnSchema::new("name", ValueType::Text).with(Constraint::pattern(r"^[A-Z][A-Z .'\-]+$").unwrap())],
        );
        let mut ok = Table::new(TableType::Roster, "1", vec!["name".into()]);
        let mut r = Record::new();
        r.push("name", Value::Text("MARC-ANDRE FLEURY".into()));
        ok.records.push(r);
        assert!(validate(ok, &schema).is_conforming());

        let mut bad = Table::new(TableType::Roster, "1", vec!["name".into()]);
        let mut r = Record::new();
        r.push("name", Value::Text("87".into()));
        bad.records.push(r);
        assert!(!validate(bad, &schema).is_conforming());
        assert!(Constraint::pattern("([").is_err());
    }
}
