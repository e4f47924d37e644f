use tracing::trace;

use crate::domain::TVError;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A fixed size slice of the filtered and sorted rows.
#[derive(Debug, PartialEq)]
pub struct Page<'a, T> {
    pub rows: &'a [T],
    pub page_index: usize,
    pub page_count: usize,
}

/// `ceil(len / page_size)`, but never less than one page.
pub fn page_count(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1)).max(1)
}

/// Slices out page `page_index`. An out of range index yields an empty page.
pub fn paginate<T>(rows: &[T], page_index: usize, page_size: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let start = page_index.saturating_mul(page_size).min(rows.len());
    let end = start.saturating_add(page_size).min(rows.len());
    Page {
        rows: &rows[start..end],
        page_index,
        page_count: page_count(rows.len(), page_size),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_index: usize,
    page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination { page_index: 0, page_size: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> Result<Self, TVError> {
        if page_size == 0 {
            return Err(TVError::InvalidPageSize);
        }
        Ok(Pagination { page_index: 0, page_size })
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self, row_count: usize) -> usize {
        page_count(row_count, self.page_size)
    }

    pub fn can_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn can_next(&self, row_count: usize) -> bool {
        self.page_index + 1 < self.page_count(row_count)
    }

    pub fn first(&mut self) {
        self.page_index = 0;
    }

    pub fn previous(&mut self) {
        self.page_index = self.page_index.saturating_sub(1);
    }

    pub fn next(&mut self, row_count: usize) {
        if self.can_next(row_count) {
            self.page_index += 1;
        }
    }

    pub fn last(&mut self, row_count: usize) {
        self.page_index = self.page_count(row_count) - 1;
    }

    pub fn set_page_index(&mut self, page_index: usize, row_count: usize) {
        self.page_index = page_index.min(self.page_count(row_count) - 1);
    }

    /// Changes the page size and keeps the first row of the current page visible.
    pub fn set_page_size(&mut self, page_size: usize, row_count: usize) -> Result<(), TVError> {
        if page_size == 0 {
            return Err(TVError::InvalidPageSize);
        }
        let first_row = self.page_index * self.page_size;
        self.page_size = page_size;
        self.set_page_index(first_row / page_size, row_count);
        Ok(())
    }

    /// Pulls the page index back in range after the row count shrank.
    pub fn clamp(&mut self, row_count: usize) {
        let last = self.page_count(row_count) - 1;
        if self.page_index > last {
            trace!("Clamping page index {} to {}", self.page_index, last);
            self.page_index = last;
        }
    }

    pub fn page<'a, T>(&self, rows: &'a [T]) -> Page<'a, T> {
        paginate(rows, self.page_index, self.page_size)
    }
}
