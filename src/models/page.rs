//! Pagination of listings

use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::{
    config::PaginationConfig,
    error::{AppError, AppResult, FieldErrors},
};

/// Page parameters as received from the client.
/// Kept as text so a malformed number is answered by the paginator.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number, starting at 1 (default: 1)
    #[param(value_type = Option<i64>)]
    pub page: Option<String>,
    /// Entities per page (default from configuration)
    #[param(value_type = Option<i64>)]
    pub per_page: Option<String>,
}

impl PageQuery {
    pub fn page(page: i64) -> Self {
        Self {
            page: Some(page.to_string()),
            per_page: None,
        }
    }

    pub fn per_page(mut self, per_page: i64) -> Self {
        self.per_page = Some(per_page.to_string());
        self
    }
}

/// Blank values count as absent
fn raw_param(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Slice of rows a store should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: i64,
    pub limit: i64,
}

impl Window {
    /// Every row; used for inline listings and counts
    pub const ALL: Window = Window {
        offset: 0,
        limit: i64::MAX,
    };

    /// Apply the window to an already ordered in-memory sequence
    pub fn slice<T: Clone>(&self, rows: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let len = usize::try_from(self.limit).unwrap_or(usize::MAX);
        rows.iter().skip(start).take(len).cloned().collect()
    }
}

/// Validated page request. Only built by `Paginator::resolve`, which
/// guarantees the offset fits in an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
    offset: i64,
}

impl PageRequest {
    pub fn window(&self) -> Window {
        Window {
            offset: self.offset,
            limit: self.per_page,
        }
    }

    /// Fails with `NotFound` when the page lies past the last one.
    /// Page 1 of an empty listing is valid.
    pub fn ensure_in_range(&self, total: i64) -> AppResult<()> {
        if self.page > num_pages(total, self.per_page) {
            return Err(AppError::NotFound(format!("Invalid page ({})", self.page)));
        }
        Ok(())
    }
}

fn num_pages(total: i64, per_page: i64) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + per_page - 1) / per_page
    }
}

/// Resolves client page parameters against configured limits
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: i64,
    max_page_size: i64,
}

impl Paginator {
    pub fn new(config: &PaginationConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            max_page_size: config.max_page_size.max(config.page_size).max(1),
        }
    }

    pub fn resolve(&self, query: &PageQuery) -> AppResult<PageRequest> {
        let page = match raw_param(&query.page) {
            None => 1,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|page| *page >= 1)
                .ok_or_else(|| AppError::NotFound(format!("Invalid page ({})", raw)))?,
        };

        let per_page = match raw_param(&query.per_page) {
            None => self.page_size,
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| FieldErrors::single("per_page", "Enter a whole number."))?,
        };
        if per_page < 1 || per_page > self.max_page_size {
            return Err(FieldErrors::single(
                "per_page",
                format!("Must be between 1 and {}", self.max_page_size),
            )
            .into());
        }

        // No listing can reach a page whose offset does not fit
        let offset = (page - 1)
            .checked_mul(per_page)
            .ok_or_else(|| AppError::NotFound(format!("Invalid page ({})", page)))?;

        Ok(PageRequest {
            page,
            per_page,
            offset,
        })
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of entities across all pages
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub num_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: &PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            num_pages: num_pages(total, request.per_page),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            num_pages: self.num_pages,
        }
    }
}
