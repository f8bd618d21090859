//! Query string of list endpoints
//!
//! Paging values arrive as text and are parsed leniently: a missing, empty,
//! non-numeric or zero value falls back to the default, the page size is
//! clamped to the configured maximum.
//!
//! # Example
//!
//! ```rust
//! use crud_service::handlers::ListQuery;
//! use crud_service::repository::PageLimits;
//!
//! let query = ListQuery::new().with_page("2").with_size_page("500");
//! let request = query.pagination(&PageLimits::default());
//!
//! assert_eq!(request.page(), 2);
//! assert_eq!(request.size_page(), 100);
//! assert_eq!(request.offset(), 100);
//! ```

use serde::{Deserialize, Serialize};

use crate::repository::{
    Entity, FilterCondition, ListCriteria, OrderDirection, PageLimits, PaginationRequest,
};

/// Column every list is ordered by
pub const ORDER_COLUMN: &str = "created_at";

/// Query parameters for list operations
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Page number (1-indexed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    /// Number of items per page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_page: Option<String>,

    /// Case-insensitive search over the entity's unique column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
}

impl ListQuery {
    /// Create a new empty query
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page number
    #[must_use]
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    /// Set the number of items per page
    #[must_use]
    pub fn with_size_page(mut self, size_page: impl Into<String>) -> Self {
        self.size_page = Some(size_page.into());
        self
    }

    /// Set the search text
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Page number, if the client sent a usable one
    #[must_use]
    pub fn page_number(&self) -> Option<u32> {
        parse_positive(self.page.as_deref())
    }

    /// Page size, if the client sent a usable one
    #[must_use]
    pub fn items_per_page(&self) -> Option<u32> {
        parse_positive(self.size_page.as_deref())
    }

    /// Search text with surrounding whitespace removed, if any is left
    #[must_use]
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Normalized pagination request
    #[must_use]
    pub fn pagination(&self, limits: &PageLimits) -> PaginationRequest {
        limits.request(self.page_number(), self.items_per_page())
    }

    /// Criteria shared by the page and count reads of `E`
    #[must_use]
    pub fn criteria<E: Entity>(&self) -> ListCriteria {
        let criteria = ListCriteria::new().with_order(ORDER_COLUMN, OrderDirection::Asc);
        match self.search_text() {
            Some(text) => criteria.with_filter(FilterCondition::contains(E::UNIQUE_COLUMN, text)),
            None => criteria,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::FilterOperator;
    use crate::roles::Role;

    #[test]
    fn test_lenient_paging() {
        let limits = PageLimits::default();

        let request = ListQuery::new().pagination(&limits);
        assert_eq!((request.page(), request.size_page()), (1, 20));

        let request = ListQuery::new()
            .with_page("abc")
            .with_size_page("0")
            .pagination(&limits);
        assert_eq!((request.page(), request.size_page()), (1, 20));

        let request = ListQuery::new()
            .with_page(" 3 ")
            .with_size_page("-5")
            .pagination(&limits);
        assert_eq!((request.page(), request.size_page()), (3, 20));
    }

    #[test]
    fn test_configured_limits_apply() {
        let limits = PageLimits {
            default_size_page: 10,
            max_size_page: 25,
        };
        let request = ListQuery::new().with_size_page("40").pagination(&limits);
        assert_eq!(request.size_page(), 25);
        assert_eq!(ListQuery::new().pagination(&limits).size_page(), 10);
    }

    #[test]
    fn test_search_becomes_contains_filter() {
        let criteria = ListQuery::new().with_search("  geren ").criteria::<Role>();
        let filter = &criteria.filters()[0];
        assert_eq!(filter.field, "name");
        assert_eq!(filter.operator, FilterOperator::Contains);
        assert_eq!(criteria.order_by(), Some((ORDER_COLUMN, OrderDirection::Asc)));

        let blank = ListQuery::new().with_search("   ").criteria::<Role>();
        assert!(blank.filters().is_empty());
    }

    #[test]
    fn test_deserializes_camel_case() {
        let query: ListQuery = serde_json::from_str(r#"{"page":"2","sizePage":"5"}"#).unwrap();
        assert_eq!(query.page_number(), Some(2));
        assert_eq!(query.items_per_page(), Some(5));
    }
}
