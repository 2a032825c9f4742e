//! Query specification and its validation against entity descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::descriptor::EntityDescriptor;
use crate::error::CoreError;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

/// One field filter of a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }
}

/// Caller-supplied query parameters, not yet checked against a descriptor.
///
/// Constructed per request and never persisted. `resolve` turns it into a
/// [`ResolvedQuery`] or fails with `InvalidQuery` listing every violation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuerySpec {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
    pub search: Option<String>,
    pub filters: Vec<FieldFilter>,
}

impl QuerySpec {
    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(field.into());
        self.direction = Some(direction);
        self
    }

    pub fn with_search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        self.filters.push(FieldFilter::new(field, op, value));
        self
    }

    /// Validate against `descriptor`, collecting every issue at once.
    pub fn resolve(self, descriptor: &EntityDescriptor) -> Result<ResolvedQuery, CoreError> {
        let mut issues = Vec::new();

        let page = self.page.unwrap_or(1);
        if page == 0 {
            issues.push("page must be at least 1".to_string());
        }

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            issues.push(format!("page_size must be between 1 and {}", MAX_PAGE_SIZE));
        }

        if let Some(field) = &self.sort {
            match descriptor.field(field) {
                None => issues.push(format!("unknown sort field '{}'", field)),
                Some(spec) if !spec.sortable => {
                    issues.push(format!("field '{}' is not sortable", field));
                }
                Some(_) => {}
            }
        }

        for filter in &self.filters {
            match descriptor.field(&filter.field) {
                None => issues.push(format!("unknown filter field '{}'", filter.field)),
                Some(spec) if !spec.filterable => {
                    issues.push(format!("field '{}' is not filterable", filter.field));
                }
                Some(spec)
                    if matches!(filter.op, FilterOp::Gte | FilterOp::Lte)
                        && !spec.range_filterable =>
                {
                    issues.push(format!(
                        "range filters are not allowed on field '{}'",
                        filter.field
                    ));
                }
                Some(_) => {}
            }
        }

        let search_fields: Vec<String> = descriptor
            .searchable_fields()
            .map(|spec| spec.name.clone())
            .collect();
        let search = self.search.filter(|needle| !needle.trim().is_empty());
        if search.is_some() && search_fields.is_empty() {
            issues.push(format!(
                "entity '{}' has no searchable fields",
                descriptor.name
            ));
        }

        if !issues.is_empty() {
            return Err(CoreError::invalid_query(issues));
        }

        Ok(ResolvedQuery {
            page,
            page_size,
            sort: self
                .sort
                .map(|field| (field, self.direction.unwrap_or(SortDirection::Asc))),
            search,
            search_fields,
            filters: self.filters,
        })
    }
}

/// A query validated against a descriptor; what stores execute.
#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    pub page: u32,
    pub page_size: u32,
    pub sort: Option<(String, SortDirection)>,
    pub search: Option<String>,
    pub search_fields: Vec<String>,
    pub filters: Vec<FieldFilter>,
}

impl ResolvedQuery {
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::descriptor::{FieldSpec, FieldType};
    use serde_json::json;

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(
            "products",
            vec![
                FieldSpec::new("name", FieldType::Text).searchable().sortable(),
                FieldSpec::new("price", FieldType::Float).range_filterable().sortable(),
                FieldSpec::new("category", FieldType::Text).filterable(),
                FieldSpec::new("notes", FieldType::Text),
            ],
        )
    }

    #[test]
    fn test_defaults() {
        let resolved = QuerySpec::default().resolve(&descriptor()).unwrap();
        assert_eq!(resolved.page, 1);
        assert_eq!(resolved.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(resolved.offset(), 0);
        assert!(resolved.sort.is_none());
    }

    #[test]
    fn test_all_issues_reported_at_once() {
        let spec = QuerySpec::default()
            .with_page(0, 500)
            .with_sort("category", SortDirection::Asc)
            .with_filter("missing", FilterOp::Eq, json!("x"))
            .with_filter("category", FilterOp::Gte, json!("a"));

        match spec.resolve(&descriptor()) {
            Err(CoreError::InvalidQuery { issues }) => {
                assert_eq!(issues.len(), 5, "issues: {issues:?}");
            }
            other => panic!("expected InvalidQuery, got {other:?}"),
        }
    }

    #[test]
    fn test_range_filter_on_range_field_is_accepted() {
        let spec = QuerySpec::default().with_filter("price", FilterOp::Gte, json!(10.0));
        assert!(spec.resolve(&descriptor()).is_ok());
    }

    #[test]
    fn test_unfilterable_field_rejected() {
        let spec = QuerySpec::default().with_filter("notes", FilterOp::Eq, json!("x"));
        assert!(spec.resolve(&descriptor()).is_err());
    }

    #[test]
    fn test_blank_search_is_dropped() {
        let resolved = QuerySpec::default()
            .with_search("   ")
            .resolve(&descriptor())
            .unwrap();
        assert!(resolved.search.is_none());
    }

    #[test]
    fn test_offset_reflects_page() {
        let resolved = QuerySpec::default()
            .with_page(3, 25)
            .resolve(&descriptor())
            .unwrap();
        assert_eq!(resolved.offset(), 50);
    }
}
