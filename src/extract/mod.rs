//! Field extractors: locate one value relative to a row and coerce it.
//!
//! Extraction is total-or-explicit-failure per field. A missing element or an
//! unreadable cell is an [`ExtractionError`] unless the field spec says
//! otherwise; no defaults are invented.

pub mod table;

use crate::error::{ExtractionError, SpecError};
use crate::models::{ExtractedField, TableType, Value, ValueType};
use crate::scraper::cleaner::{
    normalise_text, parse_bool, parse_clock, parse_float, parse_int, parse_percent, strip_markers,
};
use crate::scraper::parsers::{compile_selector, Node};
use scraper::Selector;

/// Where the raw text of a field comes from once its element is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Text,
    /// The n-th non-blank line of a cell split by `<br>`.
    Line(usize),
    Attr(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    None,
    /// "MM:SS" → seconds.
    Clock,
    /// Strip a trailing `%`.
    Percent,
    /// Boolean from the element's class list, ignoring its text.
    HasClass(&'static str),
    /// Boolean: text contains the marker.
    Marker(&'static str),
    /// Drop parenthesised markers from text.
    StripMarkers,
}

impl Transform {
    fn applies_to(&self, kind: ValueType) -> bool {
        match self {
            Self::None => true,
            Self::Clock => kind == ValueType::Integer,
            Self::Percent => kind == ValueType::Float,
            Self::HasClass(_) | Self::Marker(_) => kind == ValueType::Boolean,
            Self::StripMarkers => kind == ValueType::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: ValueType,
    /// `None` targets the row element itself.
    pub selector: Option<&'static str>,
    pub source: Source,
    pub transform: Transform,
    pub optional: bool,
    pub placeholders: Vec<&'static str>,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: ValueType, selector: &'static str) -> Self {
        Self {
            name,
            kind,
            selector: Some(selector),
            source: Source::Text,
            transform: Transform::None,
            optional: false,
            placeholders: Vec::new(),
        }
    }

    pub fn integer(name: &'static str, selector: &'static str) -> Self {
        Self::new(name, ValueType::Integer, selector)
    }

    pub fn float(name: &'static str, selector: &'static str) -> Self {
        Self::new(name, ValueType::Float, selector)
    }

    pub fn text(name: &'static str, selector: &'static str) -> Self {
        Self::new(name, ValueType::Text, selector)
    }

    pub fn boolean(name: &'static str, selector: &'static str) -> Self {
        Self::new(name, ValueType::Boolean, selector)
    }

    pub fn on_row(mut self) -> Self {
        self.selector = None;
        self
    }

    pub fn attr(mut self, name: &'static str) -> Self {
        self.source = Source::Attr(name);
        self
    }

    pub fn line(mut self, n: usize) -> Self {
        self.source = Source::Line(n);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Text treated as "no data". Only optional fields turn it into `Null`.
    pub fn placeholder(mut self, text: &'static str) -> Self {
        self.placeholders.push(text);
        self
    }
}

/// A field spec with its selector compiled.
#[derive(Debug, Clone)]
pub struct CompiledField {
    spec: FieldSpec,
    selector: Option<Selector>,
}

impl CompiledField {
    pub fn compile(table: TableType, spec: FieldSpec) -> Result<Self, SpecError> {
        if !spec.transform.applies_to(spec.kind) {
            return Err(SpecError::IncompatibleTransform {
                table,
                field: spec.name.to_string(),
                transform: format!("{:?}", spec.transform),
                kind: spec.kind,
            });
        }
        let selector = spec
            .selector
            .map(|s| compile_selector(&format!("{}.{}", table, spec.name), s))
            .transpose()?;
        Ok(Self { spec, selector })
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }
}

// ── Extraction ────────────────────────────────────────────────────────────────

pub fn extract_field(row: &Node<'_>, field: &CompiledField) -> Result<ExtractedField, ExtractionError> {
    let spec = &field.spec;

    let located = match &field.selector {
        None => Some(*row),
        Some(sel) => row.select_first(sel),
    };
    let Some(node) = located else {
        return missing(spec);
    };

    if let Transform::HasClass(class) = spec.transform {
        return Ok(ExtractedField {
            name: spec.name.to_string(),
            raw: node.attr("class").unwrap_or_default().to_string(),
            value: Value::Boolean(node.has_class(class)),
        });
    }

    let raw = match spec.source {
        Source::Text => node.text(),
        Source::Line(n) => match node.text_line(n) {
            Some(line) => line,
            None => return missing(spec),
        },
        Source::Attr(attr) => match node.attr(attr) {
            Some(v) => normalise_text(v),
            None => return missing(spec),
        },
    };

    if spec.placeholders.contains(&raw.as_str()) {
        return if spec.optional {
            Ok(ExtractedField {
                name: spec.name.to_string(),
                raw,
                value: Value::Null,
            })
        } else {
            Err(coercion_failure(spec, raw, "placeholder in a required field".to_string()))
        };
    }

    match coerce(&raw, spec) {
        Ok(value) => Ok(ExtractedField {
            name: spec.name.to_string(),
            raw,
            value,
        }),
        Err(reason) => Err(coercion_failure(spec, raw, reason)),
    }
}

fn missing(spec: &FieldSpec) -> Result<ExtractedField, ExtractionError> {
    if spec.optional {
        return Ok(ExtractedField {
            name: spec.name.to_string(),
            raw: String::new(),
            value: Value::Null,
        });
    }
    let target = spec.selector.unwrap_or(":scope");
    let selector = match spec.source {
        Source::Text => target.to_string(),
        Source::Line(n) => format!("{} (line {})", target, n + 1),
        Source::Attr(attr) => format!("{}[{}]", target, attr),
    };
    Err(ExtractionError::NotFound {
        field: spec.name.to_string(),
        selector,
    })
}

fn coercion_failure(spec: &FieldSpec, text: String, reason: String) -> ExtractionError {
    ExtractionError::CoercionFailure {
        field: spec.name.to_string(),
        text,
        expected: spec.kind,
        reason,
    }
}

fn coerce(raw: &str, spec: &FieldSpec) -> Result<Value, String> {
    match (spec.kind, spec.transform) {
        (ValueType::Integer, Transform::Clock) => parse_clock(raw).map(Value::Integer),
        (ValueType::Integer, _) => parse_int(raw).map(Value::Integer),

        (ValueType::Float, Transform::Percent) => parse_percent(raw).map(Value::Float),
        (ValueType::Float, _) => parse_float(raw).map(Value::Float),

        (ValueType::Text, transform) => {
            let text = if transform == Transform::StripMarkers {
                strip_markers(raw)
            } else {
                raw.to_string()
            };
            if text.is_empty() {
                Err("empty text".to_string())
            } else {
                Ok(Value::Text(text))
            }
        }

        (ValueType::Boolean, Transform::Marker(marker)) => Ok(Value::Boolean(raw.contains(marker))),
        (ValueType::Boolean, _) => parse_bool(raw).map(Value::Boolean),
    }
}
