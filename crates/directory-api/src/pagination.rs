//! Optional page-number pagination.
//!
//! A list endpoint paginates only when the request carries `page` or
//! `page_size`; otherwise it returns every match as a bare JSON array.

use crate::{ApiError, ApiResult};
use axum::{
    http::Uri,
    response::{IntoResponse, Response},
    Json,
};
use directory_core::{ListQuery, Page};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u64 = 25;
/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: u64 = 100;

const INVALID_PAGE: &str = "Invalid page.";

/// Query string shared by list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    /// Search term.
    pub search: Option<String>,
    /// 1-based page number, or `last`.
    pub page: Option<String>,
    /// Requested page size.
    pub page_size: Option<String>,
}

impl ListParams {
    /// The unwindowed store query.
    #[must_use]
    pub fn base_query(&self) -> ListQuery {
        match &self.search {
            Some(term) => ListQuery::all().with_search(term.as_str()),
            None => ListQuery::all(),
        }
    }

    /// Parses the pagination parameters; `None` when the client asked for
    /// none.
    pub fn page_request(&self) -> ApiResult<Option<PageRequest>> {
        if self.page.is_none() && self.page_size.is_none() {
            return Ok(None);
        }

        let size = self
            .page_size
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|size| *size > 0)
            .map_or(DEFAULT_PAGE_SIZE, |size| size.min(MAX_PAGE_SIZE));

        let number = match self.page.as_deref().map(str::trim) {
            None => PageNumber::At(1),
            Some("last") => PageNumber::Last,
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .map(PageNumber::At)
                .ok_or_else(|| ApiError::NotFound(INVALID_PAGE.to_string()))?,
        };

        Ok(Some(PageRequest { number, size }))
    }
}

/// Requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    /// A specific 1-based page.
    At(u64),
    /// The final page.
    Last,
}

/// Parsed pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Requested page.
    pub number: PageNumber,
    /// Items per page.
    pub size: u64,
}

/// Number of pages for `total` items; an empty result still has one page.
#[must_use]
pub fn page_count(total: u64, size: u64) -> u64 {
    total.div_ceil(size).max(1)
}

/// Paginated response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Total matches.
    pub count: u64,
    /// Link to the next page.
    pub next: Option<String>,
    /// Link to the previous page.
    pub previous: Option<String>,
    /// Items on this page.
    pub results: Vec<T>,
}

/// A list endpoint's body: bare array or paginated envelope.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    /// Every match.
    All(Vec<T>),
    /// One page.
    Paged(Paginated<T>),
}

impl<T> ListResponse<T> {
    /// Items in the body.
    pub fn items(&self) -> &[T] {
        match self {
            Self::All(items) => items,
            Self::Paged(page) => &page.results,
        }
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Runs a list call, windowing it when the client asked for a page.
///
/// `fetch` is called once, or twice for `page=last` (the first call only
/// counts).
pub async fn list<T, F, Fut>(params: &ListParams, uri: &Uri, fetch: F) -> ApiResult<ListResponse<T>>
where
    F: Fn(ListQuery) -> Fut,
    Fut: Future<Output = ApiResult<Page<T>>>,
{
    let base = params.base_query();
    let Some(request) = params.page_request()? else {
        return Ok(ListResponse::All(fetch(base).await?.items));
    };

    let number = match request.number {
        PageNumber::At(n) => n,
        PageNumber::Last => {
            let counted = fetch(base.clone().with_window(0, 0)).await?;
            page_count(counted.total, request.size)
        }
    };

    let offset = (number - 1).saturating_mul(request.size);
    let page = fetch(base.with_window(offset, request.size)).await?;

    let pages = page_count(page.total, request.size);
    if number > pages {
        return Err(ApiError::NotFound(INVALID_PAGE.to_string()));
    }

    Ok(ListResponse::Paged(Paginated {
        count: page.total,
        next: (number < pages).then(|| page_link(uri, Some(number + 1))),
        previous: match number {
            1 => None,
            2 => Some(page_link(uri, None)),
            n => Some(page_link(uri, Some(n - 1))),
        },
        results: page.items,
    }))
}

/// Rebuilds the request URI with `page` replaced (or removed for `None`).
fn page_link(uri: &Uri, page: Option<u64>) -> String {
    let mut pairs: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some("page"))
        .map(str::to_string)
        .collect();
    if let Some(page) = page {
        pairs.push(format!("page={page}"));
    }

    if pairs.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), pairs.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<&str>, page_size: Option<&str>) -> ListParams {
        ListParams {
            search: None,
            page: page.map(str::to_string),
            page_size: page_size.map(str::to_string),
        }
    }

    #[test]
    fn test_no_params_means_no_pagination() {
        assert_eq!(params(None, None).page_request().unwrap(), None);
    }

    #[test]
    fn test_page_size_defaults_and_caps() {
        let req = params(Some("2"), None).page_request().unwrap().unwrap();
        assert_eq!(req, PageRequest { number: PageNumber::At(2), size: DEFAULT_PAGE_SIZE });

        let req = params(None, Some("500")).page_request().unwrap().unwrap();
        assert_eq!(req.size, MAX_PAGE_SIZE);
        assert_eq!(req.number, PageNumber::At(1));

        let req = params(None, Some("zero")).page_request().unwrap().unwrap();
        assert_eq!(req.size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_malformed_page_is_not_found() {
        for raw in ["0", "-1", "abc", ""] {
            let err = params(Some(raw), None).page_request().unwrap_err();
            assert_eq!(err.to_string(), "Invalid page.");
        }
        assert_eq!(
            params(Some("last"), None).page_request().unwrap().unwrap().number,
            PageNumber::Last
        );
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 25), 1);
        assert_eq!(page_count(25, 25), 1);
        assert_eq!(page_count(26, 25), 2);
    }

    #[test]
    fn test_page_link_replaces_page() {
        let uri: Uri = "/routes/vendors?search=amp&page=2&page_size=5".parse().unwrap();
        assert_eq!(page_link(&uri, Some(3)), "/routes/vendors?search=amp&page_size=5&page=3");
        assert_eq!(page_link(&uri, None), "/routes/vendors?search=amp&page_size=5");

        let bare: Uri = "/routes/vendors?page=2".parse().unwrap();
        assert_eq!(page_link(&bare, None), "/routes/vendors");
    }

    #[tokio::test]
    async fn test_list_windows_and_links() {
        let items: Vec<u64> = (1..=7).collect();
        let uri: Uri = "/routes/suppliers?page=2&page_size=3".parse().unwrap();
        let response = list(&params(Some("2"), Some("3")), &uri, |q: ListQuery| {
            let items = items.clone();
            async move { Ok(Page::new(q.window(items.clone()), items.len() as u64)) }
        })
        .await
        .unwrap();

        match response {
            ListResponse::Paged(page) => {
                assert_eq!(page.count, 7);
                assert_eq!(page.results, vec![4, 5, 6]);
                assert_eq!(page.next.as_deref(), Some("/routes/suppliers?page_size=3&page=3"));
                assert_eq!(page.previous.as_deref(), Some("/routes/suppliers?page_size=3"));
            }
            ListResponse::All(_) => panic!("expected a page"),
        }
    }

    #[tokio::test]
    async fn test_list_out_of_range_page() {
        let uri: Uri = "/routes/categories?page=9".parse().unwrap();
        let err = list(&params(Some("9"), None), &uri, |q: ListQuery| async move {
            Ok(Page::new(q.window(Vec::<u64>::new()), 0))
        })
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_last_page() {
        let uri: Uri = "/routes/categories?page=last&page_size=4".parse().unwrap();
        let response = list(&params(Some("last"), Some("4")), &uri, |q: ListQuery| async move {
            let all: Vec<u64> = (1..=10).collect();
            Ok(Page::new(q.window(all), 10))
        })
        .await
        .unwrap();
        assert_eq!(response.items(), &[9, 10]);
    }
}
