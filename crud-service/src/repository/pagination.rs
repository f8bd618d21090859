//! Pagination and filtering types for repository queries
//!
//! [`PaginationRequest`] describes the requested page, [`PaginationResult`]
//! the totals computed once the page and the count are known. [`ListCriteria`]
//! holds the filter shared by the page query and the count query so both reads
//! always see the same predicate.
//!
//! # Example
//!
//! ```rust
//! use crud_service::repository::{FilterCondition, ListCriteria, PaginationRequest, PaginationResult};
//!
//! let request = PaginationRequest::new(3, 20);
//! assert_eq!(request.offset(), 40);
//!
//! let criteria = ListCriteria::new().with_filter(FilterCondition::contains("name", "ger"));
//! assert_eq!(criteria.filters().len(), 1);
//!
//! let result = PaginationResult::compute(&request, 45, 5);
//! assert_eq!(result.last_page, 3);
//! assert_eq!((result.from, result.to), (41, 45));
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of rows per page
pub const DEFAULT_SIZE_PAGE: u32 = 20;

/// Maximum allowed rows per page
pub const MAX_SIZE_PAGE: u32 = 100;

/// Requested page, 1-indexed
///
/// Both fields are always at least 1.
///
/// ```rust
/// use crud_service::repository::PaginationRequest;
///
/// let page = PaginationRequest::from_raw(Some(0), None);
/// assert_eq!(page.page(), 1);
/// assert_eq!(page.size_page(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationRequest {
    page: u32,
    size_page: u32,
}

impl PaginationRequest {
    /// Create a page request; zero values are raised to 1
    #[must_use]
    pub fn new(page: u32, size_page: u32) -> Self {
        Self {
            page: page.max(1),
            size_page: size_page.max(1),
        }
    }

    /// Build from optional client values with the default limits
    #[must_use]
    pub fn from_raw(page: Option<u32>, size_page: Option<u32>) -> Self {
        PageLimits::default().request(page, size_page)
    }

    /// Page number (1-indexed)
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page
    #[must_use]
    pub const fn size_page(&self) -> u32 {
        self.size_page
    }

    /// Rows to skip: `(page - 1) × size_page`
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.size_page)
    }

    /// Rows to take
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.size_page.max(1))
    }
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_SIZE_PAGE)
    }
}

/// Default and maximum page sizes applied to client requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    /// Size used when the client sends none or an invalid one
    pub default_size_page: u32,
    /// Upper bound on the page size
    pub max_size_page: u32,
}

impl PageLimits {
    /// Normalize client values into a request
    ///
    /// Absent or zero values fall back to page 1 and the default size; the
    /// size is clamped to the maximum.
    #[must_use]
    pub fn request(&self, page: Option<u32>, size_page: Option<u32>) -> PaginationRequest {
        let max = self.max_size_page.max(1);
        let default = self.default_size_page.clamp(1, max);
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let size_page = size_page
            .filter(|s| *s > 0)
            .map_or(default, |s| s.min(max));
        PaginationRequest::new(page, size_page)
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size_page: DEFAULT_SIZE_PAGE,
            max_size_page: MAX_SIZE_PAGE,
        }
    }
}

/// Totals computed for a page of results
///
/// With no matching rows every field except `current_page` and `size_page` is
/// 0, including `last_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult {
    /// Requested page
    pub current_page: u32,
    /// 1-based position of the first returned row, 0 when none
    pub from: u64,
    /// 1-based position of the last returned row, 0 when none
    pub to: u64,
    /// Number of pages, `ceil(total / size_page)`
    pub last_page: u64,
    /// Rows per page
    pub size_page: u32,
    /// Rows matching the criteria
    pub total: u64,
}

impl PaginationResult {
    /// Compute totals from the request, the count and the rows returned
    #[must_use]
    pub fn compute(request: &PaginationRequest, total: u64, returned: usize) -> Self {
        let returned = u64::try_from(returned).unwrap_or(u64::MAX);
        let (from, to) = if returned == 0 {
            (0, 0)
        } else {
            let offset = request.offset();
            (offset + 1, offset.saturating_add(returned))
        };

        Self {
            current_page: request.page(),
            from,
            to,
            last_page: total.div_ceil(request.limit()),
            size_page: request.size_page(),
            total,
        }
    }
}

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Asc,
    /// Sort in descending order (Z-A, 9-0)
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Case-insensitive substring match (ILIKE '%v%')
    Contains,
    /// Value is null (IS NULL)
    IsNull,
    /// Value is not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::Contains => write!(f, "ILIKE"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// A column value used by filters and existence checks
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// Boolean value
    Boolean(bool),
    /// UUID value
    Uuid(Uuid),
    /// Timestamp value
    Timestamp(DateTime<Utc>),
    /// Null value
    Null,
}

impl FilterValue {
    /// Text form used when comparing against string parameters
    ///
    /// `Null` has no text form.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Integer(n) => Some(n.to_string()),
            Self::Boolean(b) => Some(b.to_string()),
            Self::Uuid(id) => Some(id.to_string()),
            Self::Timestamp(ts) => Some(ts.to_rfc3339()),
            Self::Null => None,
        }
    }

    /// Whether this is `Null`
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Uuid> for FilterValue {
    fn from(id: Uuid) -> Self {
        Self::Uuid(id)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

/// A single filter condition for querying entities
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The column to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Equality filter (field = value)
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// Inequality filter (field != value)
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// Case-insensitive substring filter
    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Contains, FilterValue::String(needle.into()))
    }

    /// Null check (field IS NULL)
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, FilterValue::Null)
    }

    /// Not-null check (field IS NOT NULL)
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FilterValue::Null)
    }

    /// Evaluate the condition against a column value
    ///
    /// A missing column behaves like `Null`.
    #[must_use]
    pub fn matches(&self, actual: Option<&FilterValue>) -> bool {
        let actual = actual.unwrap_or(&FilterValue::Null);
        match self.operator {
            FilterOperator::Equal => values_equal(actual, &self.value),
            FilterOperator::NotEqual => !values_equal(actual, &self.value),
            FilterOperator::Contains => match (actual.as_text(), self.value.as_text()) {
                (Some(haystack), Some(needle)) => haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                _ => false,
            },
            FilterOperator::IsNull => actual.is_null(),
            FilterOperator::IsNotNull => !actual.is_null(),
        }
    }
}

/// Compare two values, treating a string parameter as the text form of the column
pub(crate) fn values_equal(actual: &FilterValue, expected: &FilterValue) -> bool {
    match (actual, expected) {
        (FilterValue::Null, FilterValue::Null) => true,
        (FilterValue::Null, _) | (_, FilterValue::Null) => false,
        (_, FilterValue::String(s)) => actual.as_text().as_deref() == Some(s.as_str()),
        _ => actual == expected,
    }
}

/// Filter and ordering shared by the page read and the count read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListCriteria {
    filters: Vec<FilterCondition>,
    order_by: Option<(String, OrderDirection)>,
}

impl ListCriteria {
    /// Criteria matching every live row
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition
    #[must_use]
    pub fn with_filter(mut self, filter: FilterCondition) -> Self {
        self.filters.push(filter);
        self
    }

    /// Order by `field`
    #[must_use]
    pub fn with_order(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Filter conditions, all of which must hold
    #[must_use]
    pub fn filters(&self) -> &[FilterCondition] {
        &self.filters
    }

    /// Requested ordering
    #[must_use]
    pub fn order_by(&self) -> Option<(&str, OrderDirection)> {
        self.order_by.as_ref().map(|(f, d)| (f.as_str(), *d))
    }
}
