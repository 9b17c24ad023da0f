/// Candidate validation against a declared resource schema.
///
/// Fields are checked in declaration order and the first failure is
/// reported. Successful validation is the only way to obtain `ValidFields`,
/// which is what storage adapters accept for writes.
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use super::field::{FieldKind, FieldSpec, ResourceSchema};
use crate::record::model::timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("{0} is required")]
    Required(String),
    #[error("{0} must be a string")]
    NotAString(String),
    #[error("{0} must be a valid date")]
    InvalidDate(String),
    #[error("{0} is not allowed to be empty")]
    Empty(String),
    #[error("{field} length must be at least {min}")]
    TooShort { field: String, min: usize },
    #[error("{field} length must be at most {max}")]
    TooLong { field: String, max: usize },
    #[error("{0} must be a valid email")]
    InvalidEmail(String),
    #[error("{field} must be one of [{allowed}]")]
    NotAllowedValue { field: String, allowed: String },
    #[error("{0} is not allowed")]
    UnknownField(String),
}

/// Editable fields that passed schema validation, normalized and with
/// defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidFields(Map<String, Value>);

impl ValidFields {
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// Validate a candidate body for create or update. Both operations replace
/// the full set of editable fields, so the rules are identical.
pub fn validate_candidate(
    schema: &ResourceSchema,
    candidate: &Value,
) -> Result<ValidFields, ValidationError> {
    let Value::Object(input) = candidate else {
        return Err(ValidationError::NotAnObject);
    };

    let mut fields = Map::new();
    for spec in &schema.fields {
        match input.get(spec.name) {
            None => {
                if let Some(default) = &spec.default {
                    fields.insert(spec.name.to_string(), default.resolve());
                } else if spec.required {
                    return Err(ValidationError::Required(spec.name.to_string()));
                }
            }
            Some(Value::Null) if spec.nullable => {
                fields.insert(spec.name.to_string(), Value::Null);
            }
            Some(value) => {
                fields.insert(spec.name.to_string(), check_value(spec, value)?);
            }
        }
    }

    if let Some(unknown) = input.keys().find(|key| schema.spec(key).is_none()) {
        return Err(ValidationError::UnknownField(unknown.clone()));
    }

    Ok(ValidFields(fields))
}

fn check_value(spec: &FieldSpec, value: &Value) -> Result<Value, ValidationError> {
    let name = spec.name;
    match &spec.kind {
        FieldKind::Text {
            min,
            max,
            trim,
            allow_empty,
        } => {
            let raw = value
                .as_str()
                .ok_or_else(|| ValidationError::NotAString(name.to_string()))?;
            let text = if *trim { raw.trim() } else { raw };
            if text.is_empty() {
                return if *allow_empty {
                    Ok(Value::String(String::new()))
                } else {
                    Err(ValidationError::Empty(name.to_string()))
                };
            }
            let length = text.chars().count();
            if let Some(min) = min {
                if length < *min {
                    return Err(ValidationError::TooShort {
                        field: name.to_string(),
                        min: *min,
                    });
                }
            }
            if let Some(max) = max {
                if length > *max {
                    return Err(ValidationError::TooLong {
                        field: name.to_string(),
                        max: *max,
                    });
                }
            }
            Ok(Value::String(text.to_string()))
        }
        FieldKind::Email { lowercase } => {
            let raw = value
                .as_str()
                .ok_or_else(|| ValidationError::NotAString(name.to_string()))?;
            let email = raw.trim();
            if email.is_empty() {
                return Err(ValidationError::Empty(name.to_string()));
            }
            if !is_email(email) {
                return Err(ValidationError::InvalidEmail(name.to_string()));
            }
            let email = if *lowercase {
                email.to_lowercase()
            } else {
                email.to_string()
            };
            Ok(Value::String(email))
        }
        FieldKind::Choice { allowed } => {
            let raw = value
                .as_str()
                .ok_or_else(|| ValidationError::NotAString(name.to_string()))?;
            if allowed.iter().any(|option| *option == raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(ValidationError::NotAllowedValue {
                    field: name.to_string(),
                    allowed: allowed.join(", "),
                })
            }
        }
        FieldKind::Timestamp => parse_timestamp(value)
            .map(timestamp)
            .ok_or_else(|| ValidationError::InvalidDate(name.to_string())),
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
                return Some(at.with_timezone(&Utc));
            }
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
            Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
        }
        Value::Number(number) => Utc.timestamp_millis_opt(number.as_i64()?).single(),
        _ => None,
    }
}

/// Shape check: `local@label.label`, no whitespace, a TLD of two or more
/// characters, and hostname-safe domain labels.
fn is_email(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    let hostname_safe = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    hostname_safe && labels.len() >= 2 && labels.last().is_some_and(|tld| tld.len() >= 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog;
    use serde_json::json;

    #[test]
    fn title_shorter_than_minimum_is_rejected() {
        let err = validate_candidate(&catalog::note(), &json!({"title": "ab", "content": "x"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "title length must be at least 3");
    }

    #[test]
    fn valid_note_passes_and_is_trimmed() {
        let fields =
            validate_candidate(&catalog::note(), &json!({"title": "  abc ", "content": "x"}))
                .unwrap();
        assert_eq!(fields.get("title"), Some(&json!("abc")));
        assert_eq!(fields.get("content"), Some(&json!("x")));
    }

    #[test]
    fn missing_required_field_is_reported_in_declaration_order() {
        let err = validate_candidate(&catalog::note(), &json!({})).unwrap_err();
        assert_eq!(err, ValidationError::Required("title".to_string()));

        let err = validate_candidate(&catalog::note(), &json!({"title": "abc"})).unwrap_err();
        assert_eq!(err.to_string(), "content is required");
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        for body in [json!([]), json!("note"), json!(null), json!(3)] {
            let err = validate_candidate(&catalog::note(), &body).unwrap_err();
            assert_eq!(err, ValidationError::NotAnObject);
        }
    }

    #[test]
    fn unknown_and_store_owned_keys_are_rejected() {
        let err = validate_candidate(
            &catalog::note(),
            &json!({"title": "abc", "content": "x", "id": "123"}),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "id is not allowed");

        let err = validate_candidate(
            &catalog::note(),
            &json!({"title": "abc", "content": "x", "createdAt": "2024-01-01"}),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "createdAt is not allowed");
    }

    #[test]
    fn wrong_types_and_empty_text() {
        let err = validate_candidate(&catalog::note(), &json!({"title": 12, "content": "x"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "title must be a string");

        let err = validate_candidate(&catalog::note(), &json!({"title": "abc", "content": "  "}))
            .unwrap_err();
        assert_eq!(err.to_string(), "content is not allowed to be empty");

        let err = validate_candidate(&catalog::note(), &json!({"title": null, "content": "x"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "title must be a string");
    }

    #[test]
    fn title_longer_than_maximum_is_rejected() {
        let title = "a".repeat(256);
        let err = validate_candidate(&catalog::note(), &json!({"title": title, "content": "x"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "title length must be at most 255");
    }

    #[test]
    fn task_status_defaults_and_choices() {
        let fields = validate_candidate(&catalog::task(), &json!({"title": "write docs"})).unwrap();
        assert_eq!(fields.get("status"), Some(&json!("pending")));
        assert_eq!(fields.get("description"), None);

        let err = validate_candidate(
            &catalog::task(),
            &json!({"title": "write docs", "status": "done"}),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "status must be one of [pending, in-progress, completed]"
        );
    }

    #[test]
    fn task_description_accepts_empty_and_null() {
        let fields = validate_candidate(
            &catalog::task(),
            &json!({"title": "write docs", "description": null}),
        )
        .unwrap();
        assert_eq!(fields.get("description"), Some(&Value::Null));

        let fields = validate_candidate(
            &catalog::task(),
            &json!({"title": "write docs", "description": ""}),
        )
        .unwrap();
        assert_eq!(fields.get("description"), Some(&json!("")));
    }

    #[test]
    fn student_email_is_checked_and_lowercased() {
        let fields = validate_candidate(
            &catalog::student(),
            &json!({"name": "Ada Lovelace", "email": "Ada@Example.com", "course": "Math"}),
        )
        .unwrap();
        assert_eq!(fields.get("email"), Some(&json!("ada@example.com")));
        assert!(fields.get("registrationDate").is_some());

        let err = validate_candidate(
            &catalog::student(),
            &json!({"name": "Ada Lovelace", "email": "not-an-email", "course": "Math"}),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "email must be a valid email");
    }

    #[test]
    fn registration_date_accepts_several_forms() {
        let base = json!({"name": "Ada Lovelace", "email": "ada@example.com", "course": "Math"});
        for (input, expected) in [
            (json!("2024-03-01"), "2024-03-01T00:00:00.000Z"),
            (json!("2024-03-01T10:30:00+02:00"), "2024-03-01T08:30:00.000Z"),
            (json!(0), "1970-01-01T00:00:00.000Z"),
        ] {
            let mut body = base.clone();
            body["registrationDate"] = input;
            let fields = validate_candidate(&catalog::student(), &body).unwrap();
            assert_eq!(fields.get("registrationDate"), Some(&json!(expected)));
        }

        let mut body = base;
        body["registrationDate"] = json!("yesterday");
        let err = validate_candidate(&catalog::student(), &body).unwrap_err();
        assert_eq!(err.to_string(), "registrationDate must be a valid date");
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("a@b.co"));
        assert!(is_email("first.last+tag@mail.example.org"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@b.com"));
        assert!(!is_email("a@@b.com"));
        assert!(!is_email("a b@c.com"));
        assert!(!is_email("a@b.c"));
        assert!(!is_email("a@-b.com"));
    }
}
