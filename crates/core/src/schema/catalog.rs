//! Built-in resource declarations.

use super::field::{FieldDefault, FieldSpec, ResourceSchema, VirtualField};

pub const TASK_STATUSES: &[&str] = &["pending", "in-progress", "completed"];

pub fn note() -> ResourceSchema {
    ResourceSchema::new("note", "Note", "notes")
        .field(FieldSpec::text("title").length(3, 255).trim().required())
        .field(FieldSpec::text("content").trim().required())
}

pub fn task() -> ResourceSchema {
    ResourceSchema::new("task", "Task", "tasks")
        .field(FieldSpec::text("title").length(3, 255).required())
        .field(FieldSpec::text("description").allow_empty().nullable())
        .field(
            FieldSpec::choice("status", TASK_STATUSES)
                .default_value(FieldDefault::Static("pending")),
        )
}

pub fn student() -> ResourceSchema {
    ResourceSchema::new("student", "Student", "students")
        .field(FieldSpec::text("name").length(3, 100).trim().required())
        .field(FieldSpec::email("email").unique().required())
        .field(FieldSpec::text("course").length(2, 100).trim().required())
        .field(FieldSpec::timestamp("registrationDate").default_value(FieldDefault::Now))
}

pub fn post() -> ResourceSchema {
    ResourceSchema::new("post", "Post", "posts")
        .field(FieldSpec::text("title").trim().required())
        .field(FieldSpec::text("content").required())
        .virtual_field(VirtualField::Excerpt {
            name: "shortDescription",
            source: "content",
            max_chars: 150,
        })
}

/// Every built-in resource, in mount order.
pub fn all() -> Vec<ResourceSchema> {
    vec![note(), task(), student(), post()]
}

/// Look a built-in resource up by singular or plural name.
pub fn find(name: &str) -> Option<ResourceSchema> {
    all()
        .into_iter()
        .find(|schema| schema.name == name || schema.plural == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let schemas = all();
        for (i, a) in schemas.iter().enumerate() {
            for b in &schemas[i + 1..] {
                assert_ne!(a.name, b.name);
                assert_ne!(a.plural, b.plural);
            }
        }
    }

    #[test]
    fn find_accepts_singular_and_plural() {
        assert_eq!(find("note").map(|s| s.plural), Some("notes"));
        assert_eq!(find("students").map(|s| s.name), Some("student"));
        assert!(find("users").is_none());
    }

    #[test]
    fn only_student_email_is_unique() {
        let unique: Vec<_> = all()
            .iter()
            .flat_map(|schema| schema.unique_fields().map(move |f| (schema.name, f.name)))
            .collect();
        assert_eq!(unique, vec![("student", "email")]);
    }
}
