//! Entity descriptors: per-entity schema metadata and payload validation.

use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;

use crate::error::FieldError;
use crate::models::FieldMap;

/// Scalar type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Boolean,
    /// RFC 3339 timestamp carried as a string.
    Timestamp,
}

impl FieldType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::Text => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Timestamp => value
                .as_str()
                .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
        }
    }

    fn expectation(&self) -> &'static str {
        match self {
            FieldType::Text => "expected a string",
            FieldType::Integer => "expected an integer",
            FieldType::Float => "expected a number",
            FieldType::Boolean => "expected a boolean",
            FieldType::Timestamp => "expected an RFC 3339 timestamp string",
        }
    }
}

/// Declaration of one entity field and what queries may do with it.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub filterable: bool,
    pub range_filterable: bool,
    pub sortable: bool,
    pub searchable: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            filterable: false,
            range_filterable: false,
            sortable: false,
            searchable: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    /// Allow gte/lte filters. Implies equality filtering.
    pub fn range_filterable(mut self) -> Self {
        self.filterable = true;
        self.range_filterable = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }
}

/// Immutable schema of one registered entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityDescriptor {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn searchable_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|spec| spec.searchable)
    }

    /// Validate a payload against this schema, collecting every failure:
    /// missing required fields, unknown fields, and type mismatches.
    pub fn validate(&self, payload: &FieldMap) -> Vec<FieldError> {
        let mut errors = Vec::new();

        for spec in self.fields.iter().filter(|spec| spec.required) {
            let present = payload
                .get(&spec.name)
                .map(|value| !value.is_null())
                .unwrap_or(false);
            if !present {
                errors.push(FieldError::new(&spec.name, "required field is missing"));
            }
        }

        for (name, value) in payload {
            match self.field(name) {
                None => errors.push(FieldError::new(name, "unknown field")),
                Some(spec) => {
                    if !value.is_null() && !spec.field_type.accepts(value) {
                        errors.push(FieldError::new(name, spec.field_type.expectation()));
                    }
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product_descriptor() -> EntityDescriptor {
        EntityDescriptor::new(
            "products",
            vec![
                FieldSpec::new("name", FieldType::Text).required().searchable(),
                FieldSpec::new("price", FieldType::Float).range_filterable(),
                FieldSpec::new("stock", FieldType::Integer),
                FieldSpec::new("active", FieldType::Boolean),
                FieldSpec::new("launched_at", FieldType::Timestamp),
            ],
        )
    }

    fn payload(entries: &[(&str, Value)]) -> FieldMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_valid_payload_passes() {
        let descriptor = product_descriptor();
        let errors = descriptor.validate(&payload(&[
            ("name", json!("Widget")),
            ("price", json!(19.5)),
            ("stock", json!(3)),
            ("active", json!(true)),
            ("launched_at", json!("2026-01-15T09:00:00Z")),
        ]));
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn test_every_failure_is_collected() {
        let descriptor = product_descriptor();
        let errors = descriptor.validate(&payload(&[
            ("price", json!("free")),
            ("color", json!("red")),
            ("stock", json!(1.5)),
        ]));

        let failing: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(failing.contains(&"name"), "missing required name");
        assert!(failing.contains(&"price"), "price type mismatch");
        assert!(failing.contains(&"color"), "unknown field");
        assert!(failing.contains(&"stock"), "stock type mismatch");
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_null_clears_optional_but_not_required() {
        let descriptor = product_descriptor();

        let errors = descriptor.validate(&payload(&[
            ("name", json!("Widget")),
            ("price", Value::Null),
        ]));
        assert!(errors.is_empty());

        let errors = descriptor.validate(&payload(&[("name", Value::Null)]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "name");
    }

    #[test]
    fn test_integer_rejects_fractional_numbers() {
        let descriptor = product_descriptor();
        let errors = descriptor.validate(&payload(&[
            ("name", json!("Widget")),
            ("stock", json!(2.75)),
        ]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "stock");
    }

    #[test]
    fn test_timestamp_requires_rfc3339() {
        let descriptor = product_descriptor();
        let errors = descriptor.validate(&payload(&[
            ("name", json!("Widget")),
            ("launched_at", json!("yesterday")),
        ]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "launched_at");
    }
}
