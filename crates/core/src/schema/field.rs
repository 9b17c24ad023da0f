use chrono::Utc;
use serde_json::{Map, Value};

use crate::record::{model::timestamp, Record};

/// Constraint set for one declared field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Free text. Lengths are counted in characters after trimming.
    Text {
        min: Option<usize>,
        max: Option<usize>,
        trim: bool,
        allow_empty: bool,
    },
    Email {
        lowercase: bool,
    },
    /// One of a fixed set of string values.
    Choice {
        allowed: &'static [&'static str],
    },
    /// RFC 3339 string, `YYYY-MM-DD` date, or epoch milliseconds.
    Timestamp,
}

/// Value applied when a field is absent from the candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    Static(&'static str),
    Now,
}

impl FieldDefault {
    pub fn resolve(&self) -> Value {
        match self {
            FieldDefault::Static(value) => Value::String((*value).to_string()),
            FieldDefault::Now => timestamp(Utc::now()),
        }
    }
}

/// A named, typed attribute of a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
    pub unique: bool,
    pub default: Option<FieldDefault>,
}

impl FieldSpec {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            nullable: false,
            unique: false,
            default: None,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(
            name,
            FieldKind::Text {
                min: None,
                max: None,
                trim: false,
                allow_empty: false,
            },
        )
    }

    pub fn email(name: &'static str) -> Self {
        Self::new(name, FieldKind::Email { lowercase: true })
    }

    pub fn choice(name: &'static str, allowed: &'static [&'static str]) -> Self {
        Self::new(name, FieldKind::Choice { allowed })
    }

    pub fn timestamp(name: &'static str) -> Self {
        Self::new(name, FieldKind::Timestamp)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }

    /// Length bounds; only meaningful for text fields.
    pub fn length(mut self, min: usize, max: usize) -> Self {
        if let FieldKind::Text {
            min: lo, max: hi, ..
        } = &mut self.kind
        {
            *lo = Some(min);
            *hi = Some(max);
        }
        self
    }

    pub fn trim(mut self) -> Self {
        if let FieldKind::Text { trim, .. } = &mut self.kind {
            *trim = true;
        }
        self
    }

    pub fn allow_empty(mut self) -> Self {
        if let FieldKind::Text { allow_empty, .. } = &mut self.kind {
            *allow_empty = true;
        }
        self
    }

    /// Normalize a raw lookup value the same way a stored value is
    /// normalized, so equality lookups match what validation persisted.
    pub fn normalize_lookup(&self, raw: &str) -> Value {
        match &self.kind {
            FieldKind::Email { lowercase: true } => Value::String(raw.trim().to_lowercase()),
            FieldKind::Email { lowercase: false } => Value::String(raw.trim().to_string()),
            FieldKind::Text { trim: true, .. } => Value::String(raw.trim().to_string()),
            _ => Value::String(raw.to_string()),
        }
    }
}

/// Output-only field derived from stored ones.
#[derive(Debug, Clone, PartialEq)]
pub enum VirtualField {
    /// The first `max_chars` characters of `source`, with `...` appended
    /// when truncated.
    Excerpt {
        name: &'static str,
        source: &'static str,
        max_chars: usize,
    },
}

impl VirtualField {
    pub fn name(&self) -> &'static str {
        match self {
            VirtualField::Excerpt { name, .. } => name,
        }
    }

    fn compute(&self, record: &Record) -> Value {
        match self {
            VirtualField::Excerpt {
                source, max_chars, ..
            } => {
                let Some(text) = record.field(source).and_then(Value::as_str) else {
                    return Value::Null;
                };
                if text.chars().count() > *max_chars {
                    let cut: String = text.chars().take(*max_chars).collect();
                    Value::String(format!("{cut}..."))
                } else {
                    Value::String(text.to_string())
                }
            }
        }
    }
}

/// Declared schema of one resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    /// Singular key, e.g. `note`. Used as the record key in delete responses.
    pub name: &'static str,
    /// Capitalized name for messages, e.g. `Note`.
    pub display_name: &'static str,
    /// Plural path segment and storage collection, e.g. `notes`.
    pub plural: &'static str,
    pub fields: Vec<FieldSpec>,
    pub virtuals: Vec<VirtualField>,
}

impl ResourceSchema {
    pub fn new(name: &'static str, display_name: &'static str, plural: &'static str) -> Self {
        Self {
            name,
            display_name,
            plural,
            fields: Vec::new(),
            virtuals: Vec::new(),
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn virtual_field(mut self, field: VirtualField) -> Self {
        self.virtuals.push(field);
        self
    }

    pub fn collection(&self) -> &'static str {
        self.plural
    }

    pub fn spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|spec| spec.unique)
    }

    /// JSON form of a record including virtual fields.
    pub fn render(&self, record: &Record) -> Value {
        let mut object: Map<String, Value> = record.to_json();
        for field in &self.virtuals {
            object.insert(field.name().to_string(), field.compute(record));
        }
        Value::Object(object)
    }
}
