//! Response envelopes for REST handlers
//!
//! # Example
//!
//! ```rust
//! use crud_service::handlers::{ItemResponse, ListResponse};
//! use crud_service::repository::{PaginationRequest, PaginationResult};
//!
//! let item = ItemResponse::new("Gerencia");
//! assert_eq!(item.data, "Gerencia");
//!
//! let request = PaginationRequest::new(1, 20);
//! let list = ListResponse::new(vec![1, 2], PaginationResult::compute(&request, 2, 2));
//! assert_eq!(list.pagination.last_page, 1);
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::repository::PaginationResult;
use crate::usecase::Page;

/// Single item response wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse<T> {
    /// The response data
    pub data: T,
}

impl<T> ItemResponse<T> {
    /// Create a new item response
    pub fn new(data: T) -> Self {
        Self { data }
    }

    /// Answer with `201 Created` instead of `200 OK`
    pub fn created(self) -> Created<T> {
        Created(self)
    }
}

impl<T: Serialize> IntoResponse for ItemResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Item response sent with `201 Created`
#[derive(Debug, Clone, PartialEq)]
pub struct Created<T>(pub ItemResponse<T>);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// List response with pagination totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// Items of the requested page
    pub data: Vec<T>,
    /// Pagination totals
    pub pagination: PaginationResult,
}

impl<T> ListResponse<T> {
    /// Create a new list response
    pub fn new(data: Vec<T>, pagination: PaginationResult) -> Self {
        Self { data, pagination }
    }
}

impl<T> From<Page<T>> for ListResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self::new(page.items, page.pagination)
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::PaginationRequest;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_created_status() {
        let response = ItemResponse::new("x").created().into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["data"], "x");
    }

    #[tokio::test]
    async fn test_list_response_wire_shape() {
        let request = PaginationRequest::new(2, 2);
        let page = Page {
            items: vec!["c"],
            pagination: PaginationResult::compute(&request, 3, 1),
        };
        let response = ListResponse::from(page).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["data"], serde_json::json!(["c"]));
        assert_eq!(body["pagination"]["currentPage"], 2);
        assert_eq!(body["pagination"]["from"], 3);
        assert_eq!(body["pagination"]["to"], 3);
        assert_eq!(body["pagination"]["lastPage"], 2);
        assert_eq!(body["pagination"]["sizePage"], 2);
        assert_eq!(body["pagination"]["total"], 3);
    }
}
