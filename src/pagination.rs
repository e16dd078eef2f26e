use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based; clamped into `1..=total_pages` (1 when empty).
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slices `items` into `page_size` pages and returns the requested one.
pub fn paginate<T: Clone>(items: &[T], page_size: usize, page_number: usize) -> Result<Page<T>> {
    if page_size == 0 {
        return Err(Error::InvalidPageSize);
    }
    let total_pages = items.len().div_ceil(page_size);
    let number = page_number.clamp(1, total_pages.max(1));
    let start = (number - 1) * page_size;
    let end = (start + page_size).min(items.len());
    Ok(Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        number,
        total_pages,
        total_items: items.len(),
    })
}
