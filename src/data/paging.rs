use serde::{Deserialize, Serialize};

/// Number of page buttons shown around the current page.
const NAV_WINDOW: usize = 5;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// 1-based page cursor over a filtered row list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: usize,
    pub page_size: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.page_size.max(1)).max(1)
    }

    /// Same page size, page number clamped into `1..=total_pages`.
    pub fn clamped(self, total: usize) -> Self {
        Self {
            page: self.page.clamp(1, self.total_pages(total)),
            ..self
        }
    }

    /// Half-open index range of the current page within `total` items.
    pub fn bounds(&self, total: usize) -> std::ops::Range<usize> {
        let page = self.clamped(total);
        let start = ((page.page - 1) * page.page_size.max(1)).min(total);
        let end = (start + page.page_size.max(1)).min(total);
        start..end
    }

    /// Slice of `items` visible on this page.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.bounds(items.len())]
    }

    /// Page numbers for the navigation strip: up to five, starting two
    /// before the current page.
    pub fn window(&self, total: usize) -> Vec<usize> {
        let page = self.clamped(total);
        let last = self.total_pages(total);
        let start = page.page.saturating_sub(2).max(1);
        let end = (start + NAV_WINDOW - 1).min(last);
        (start..=end).collect()
    }

    /// "Showing a–b of n" numbers (1-based, `a == 0` when empty).
    pub fn showing(&self, total: usize) -> (usize, usize) {
        let range = self.bounds(total);
        if range.is_empty() {
            (0, 0)
        } else {
            (range.start + 1, range.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_never_zero() {
        let page = Page::default();
        assert_eq!(page.total_pages(0), 1);
        assert_eq!(page.total_pages(10), 1);
        assert_eq!(page.total_pages(11), 2);
    }

    #[test]
    fn out_of_range_page_is_clamped() {
        let page = Page { page: 9, page_size: 10 };
        assert_eq!(page.clamped(25).page, 3);
        assert_eq!(page.bounds(25), 20..25);
        assert_eq!(page.showing(25), (21, 25));
        assert_eq!(Page { page: 0, page_size: 10 }.clamped(25).page, 1);
    }

    #[test]
    fn empty_list_shows_nothing() {
        let page = Page::default();
        assert_eq!(page.showing(0), (0, 0));
        assert!(page.slice::<u8>(&[]).is_empty());
    }

    #[test]
    fn navigation_window() {
        let page = Page { page: 1, page_size: 10 };
        assert_eq!(page.window(100), vec![1, 2, 3, 4, 5]);
        let page = Page { page: 6, page_size: 10 };
        assert_eq!(page.window(100), vec![4, 5, 6, 7, 8]);
        let page = Page { page: 10, page_size: 10 };
        assert_eq!(page.window(100), vec![8, 9, 10]);
        let page = Page { page: 1, page_size: 10 };
        assert_eq!(page.window(15), vec![1, 2]);
    }
}
