//! Paged listing with a concurrent total count

use serde::{Deserialize, Serialize};

use crate::error::StructuredError;
use crate::repository::{
    Entity, EntityRepository, ListCriteria, PaginationRequest, PaginationResult,
};
use crate::usecase::context::OperationContext;

/// One page of rows and its pagination totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<E> {
    /// Rows of the requested page
    pub items: Vec<E>,
    /// Totals computed from the count read
    pub pagination: PaginationResult,
}

impl<E> Page<E> {
    /// An empty page for `request`
    #[must_use]
    pub fn empty(request: &PaginationRequest) -> Self {
        Self {
            items: Vec::new(),
            pagination: PaginationResult::compute(request, 0, 0),
        }
    }
}

/// Read one page and the total count concurrently
///
/// Both reads use the same criteria and the same operation context and are
/// joined before either result is used. If either fails, nothing is returned
/// but the error; when both fail the page read's error wins.
///
/// # Errors
///
/// Returns the failing read's error, observed in `list_with_total`.
pub async fn list_with_total<E, R>(
    repository: &R,
    ctx: &OperationContext,
    criteria: &ListCriteria,
    request: &PaginationRequest,
) -> Result<Page<E>, StructuredError>
where
    E: Entity,
    R: EntityRepository<E> + ?Sized,
{
    const FUNCTION: &str = "list_with_total";

    let (rows, total) = tokio::join!(
        repository.list(ctx, criteria, request),
        repository.count(ctx, criteria),
    );
    let rows = rows.map_err(|e| e.observed_in(FUNCTION))?;
    let total = total.map_err(|e| e.observed_in(FUNCTION))?;

    let pagination = PaginationResult::compute(request, total, rows.len());
    tracing::debug!(
        entity = E::NAME,
        total,
        returned = rows.len(),
        page = request.page(),
        "page read"
    );
    Ok(Page {
        items: rows,
        pagination,
    })
}
