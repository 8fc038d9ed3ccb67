//! Pagination utilities for catalog listings

/// Default page size for luminaire listings
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 500;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page
    pub page_size: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

impl Pagination {
    /// Whether rows remain after this page once `returned` rows are shown
    pub fn has_more(&self, returned: i64, total: i64) -> bool {
        self.offset + returned < total
    }
}

/// Calculate pagination metadata from total results and requested page
///
/// Unlike a table browser, a page past the end is not clamped: it yields an
/// empty page so infinite-scroll clients stop cleanly. Page numbers below 1
/// are treated as 1 and page sizes are clamped to `1..=MAX_PAGE_SIZE`.
///
/// # Examples
/// ```
/// use lumen_catalog::pagination::calculate_pagination;
///
/// // 120 results at 50 per page = 3 pages (50 + 50 + 20)
/// let p = calculate_pagination(120, 2, 50);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 50);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, page_size: i64) -> Pagination {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let total_pages = (total_results.max(0) + page_size - 1) / page_size;
    let page = requested_page.max(1);
    let offset = (page - 1).saturating_mul(page_size);

    Pagination {
        page,
        page_size,
        total_pages,
        offset,
    }
}
