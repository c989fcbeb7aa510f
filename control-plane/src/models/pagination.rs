//! Pagination query params and response envelope, shared by every list
//! endpoint. Defaults and bounds are enforced here, at the HTTP boundary —
//! by the time a request reaches `store`, `page`/`pageSize` are already
//! valid.

use error_types::ServiceError;
use serde::{Deserialize, Serialize};
use store::PageParams;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    /// `page` and `pageSize` must both be present or both be absent; mixing
    /// one explicit value with one default is rejected rather than silently
    /// guessed at.
    pub fn resolve(&self) -> Result<PageParams, ServiceError> {
        match (self.page, self.page_size) {
            (Some(page), Some(page_size)) => Ok(PageParams {
                page: page.max(1),
                page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            }),
            (None, None) => Ok(PageParams {
                page: 1,
                page_size: DEFAULT_PAGE_SIZE,
            }),
            _ => Err(ServiceError::validation(
                "page and pageSize must both be present or both omitted",
            )),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, params: PageParams, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + params.page_size as i64 - 1) / params.page_size as i64
        };

        Self {
            data,
            pagination: PaginationMeta {
                page: params.page,
                page_size: params.page_size,
                total,
                total_pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps_page_size_to_max() {
        let query = PageQuery {
            page: Some(1),
            page_size: Some(1000),
        };
        assert_eq!(query.resolve().unwrap().page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn page_query_floors_page_at_one() {
        let query = PageQuery {
            page: Some(0),
            page_size: Some(20),
        };
        assert_eq!(query.resolve().unwrap().page, 1);
    }

    #[test]
    fn both_omitted_uses_defaults() {
        let query = PageQuery {
            page: None,
            page_size: None,
        };
        let params = query.resolve().unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn only_page_present_is_rejected() {
        let query = PageQuery {
            page: Some(2),
            page_size: None,
        };
        assert!(query.resolve().is_err());
    }

    #[test]
    fn only_page_size_present_is_rejected() {
        let query = PageQuery {
            page: None,
            page_size: Some(50),
        };
        assert!(query.resolve().is_err());
    }

    #[test]
    fn total_pages_rounds_up() {
        let resp = PaginatedResponse::new(
            Vec::<()>::new(),
            PageParams {
                page: 1,
                page_size: 20,
            },
            41,
        );
        assert_eq!(resp.pagination.total_pages, 3);
    }
}
