//! Column preview paging
//!
//! Shows sample values of one source field, one page at a time. Pages are
//! appended strictly in order; a page that was already appended, or that
//! arrives for a request the pager no longer expects, is ignored. A failed
//! fetch is reported and nothing is appended; the pager never retries on its
//! own. A page shorter than the page size means there is nothing more to load.

use crate::collaborators::ColumnPreview;
use crate::error::Result;

/// A page the pager wants next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Uploaded file id
    pub file_id: u64,
    /// Source field name
    pub field: String,
    /// 1-based page number
    pub page: usize,
    /// Rows per page
    pub page_size: usize,
}

/// Append-only preview of one column
#[derive(Debug, Clone)]
pub struct PreviewPager {
    file_id: u64,
    field: String,
    page_size: usize,
    values: Vec<String>,
    pages_loaded: usize,
    exhausted: bool,
}

impl PreviewPager {
    /// Create a pager. A zero page size is treated as one.
    pub fn new(file_id: u64, field: impl Into<String>, page_size: usize) -> Self {
        Self {
            file_id,
            field: field.into(),
            page_size: page_size.max(1),
            values: Vec::new(),
            pages_loaded: 0,
            exhausted: false,
        }
    }

    /// Field being previewed
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Values loaded so far
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Number of pages appended
    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    /// Whether another page may exist
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    /// The next page to fetch, or `None` once exhausted
    pub fn next_request(&self) -> Option<PageRequest> {
        if self.exhausted {
            return None;
        }
        Some(PageRequest {
            file_id: self.file_id,
            field: self.field.clone(),
            page: self.pages_loaded + 1,
            page_size: self.page_size,
        })
    }

    /// Append the values of `request`'s page, returning how many were added.
    ///
    /// Pages for another file or field, pages already appended, and pages
    /// that skip ahead are dropped and count as zero.
    pub fn accept(&mut self, request: &PageRequest, values: Vec<String>) -> usize {
        let expected = self.next_request();
        if expected.as_ref() != Some(request) {
            tracing::debug!(
                field = %self.field,
                page = request.page,
                "discarding preview page that is no longer expected"
            );
            return 0;
        }
        let added = values.len();
        if added < self.page_size {
            self.exhausted = true;
        }
        self.values.extend(values);
        self.pages_loaded += 1;
        added
    }

    /// Fetch and append the next page.
    ///
    /// Returns the number of values appended; zero when already exhausted.
    pub async fn load_next(&mut self, source: &dyn ColumnPreview) -> Result<usize> {
        let Some(request) = self.next_request() else {
            return Ok(0);
        };
        let values = source
            .fetch_page(
                request.file_id,
                &request.field,
                request.page,
                request.page_size,
            )
            .await?;
        Ok(self.accept(&request, values))
    }
}
