use serde::{Deserialize, Serialize};
use std::fmt;

// ── Table types ───────────────────────────────────────────────────────────────

/// Logical table types produced from the NHL game reports and stats API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    /// Event summary report: one stat line per player.
    Skaters,
    /// Roster report: dressed players, starters and captaincy.
    Roster,
    /// Play-by-play report: one row per game event.
    PlayByPlay,
    /// Shift chart from the stats API: one row per player shift.
    Shifts,
}

impl TableType {
    pub const ALL: [TableType; 4] = [
        TableType::Skaters,
        TableType::Roster,
        TableType::PlayByPlay,
        TableType::Shifts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skaters => "skaters",
            Self::Roster => "roster",
            Self::PlayByPlay => "play_by_play",
            Self::Shifts => "shifts",
        }
    }

    /// Two-letter code in the HTML report file name, e.g. `ES020001.HTM`.
    /// `None` for tables that come from the JSON API.
    pub fn report_code(&self) -> Option<&'static str> {
        match self {
            Self::Skaters => Some("ES"),
            Self::Roster => Some("RO"),
            Self::PlayByPlay => Some("PL"),
            Self::Shifts => None,
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Values ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    Float,
    Text,
    Boolean,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Boolean => "boolean",
        })
    }
}

/// A coerced cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Null,
}

impl Value {
    /// `None` for `Null`.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Integer(_) => Some(ValueType::Integer),
            Self::Float(_) => Some(ValueType::Float),
            Self::Text(_) => Some(ValueType::Text),
            Self::Boolean(_) => Some(ValueType::Boolean),
            Self::Null => None,
        }
    }

    /// Numeric view used by range constraints.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> String {
        self.value_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "null".to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Null => Ok(()),
        }
    }
}

// ── Documents ─────────────────────────────────────────────────────────────────

/// HTML text of one fetched page.
#[derive(Debug, Clone)]
pub struct RawDocument {
    url: String,
    body: String,
}

impl RawDocument {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

// ── Records & tables ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedField {
    pub name: String,
    pub raw: String,
    pub value: Value,
}

/// One entity's field values, in column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Vec<ExtractedField>> for Record {
    fn from(fields: Vec<ExtractedField>) -> Self {
        Self {
            fields: fields.into_iter().map(|f| (f.name, f.value)).collect(),
        }
    }
}

/// Ordered records of one unit sharing one column set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub table_type: TableType,
    pub unit_id: String,
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(table_type: TableType, unit_id: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table_type,
            unit_id: unit_id.into(),
            columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ── Units of work ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub id: String,
    pub url: String,
}

impl Unit {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_type_names() {
        assert_eq!(TableType::PlayByPlay.to_string(), "play_by_play");
        assert_eq!(TableType::PlayByPlay.report_code(), Some("PL"));
        assert_eq!(TableType::Shifts.report_code(), None);
        assert_eq!(serde_json::to_string(&TableType::PlayByPlay).unwrap(), "\"play_by_play\"");
    }

    #[test]
    fn test_record_keeps_field_order() {
        let mut r = Record::new();
        r.push("number", Value::Integer(87));
        r.push("name", Value::Text("SIDNEY CROSBY".into()));
        assert_eq!(r.columns().collect::<Vec<_>>(), vec!["number", "name"]);
        assert_eq!(r.get("number"), Some(&Value::Integer(87)));
        assert_eq!(r.get("goals"), None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Float(52.5).to_string(), "52.5");
        assert_eq!(Value::Null.type_name(), "null");
    }
}
