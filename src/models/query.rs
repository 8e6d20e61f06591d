use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// `?page=` as sent by the browser.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// A page location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// The page number, starting at 1.
    pub num: u32,
    /// How many items fit in a page.
    pub width: u32,
}

impl Page {
    /// The offset in items to the start of the page.
    ///
    /// The offset to page 1 is 0.
    pub fn offset(&self) -> u32 {
        (self.num - 1) * self.width
    }

    /// Number of pages needed for `total` items. An empty listing still has
    /// one (empty) page.
    pub fn count(total: i64, width: u32) -> u32 {
        let width = i64::from(width.max(1));
        let pages = (total.max(0) + width - 1) / width;
        pages.max(1) as u32
    }
}

impl PageQuery {
    /// Pick the requested page out of `total` items. Anything that is not a
    /// page number, `last`, or inside the listing is a 404.
    pub fn resolve(&self, total: i64, width: u32) -> Result<Page> {
        let width = width.max(1);
        let num_pages = Page::count(total, width);

        let num = match self.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some("last") => num_pages,
            Some(raw) => raw.parse::<u32>().map_err(|_| Error::NotFound)?,
        };

        if num == 0 || num > num_pages {
            return Err(Error::NotFound);
        }

        Ok(Page { num, width })
    }
}

/// What the templates need to draw page links.
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub number: u32,
    pub num_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous: u32,
    pub next: u32,
    pub is_paginated: bool,
}

impl Pagination {
    pub fn new(page: Page, total: i64) -> Self {
        let num_pages = Page::count(total, page.width);

        Pagination {
            number: page.num,
            num_pages,
            has_previous: page.num > 1,
            has_next: page.num < num_pages,
            previous: page.num.saturating_sub(1),
            next: page.num + 1,
            is_paginated: num_pages > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: &str) -> PageQuery {
        PageQuery {
            page: Some(page.to_string()),
        }
    }

    #[test]
    fn offset_of_first_page_is_zero() {
        assert_eq!(Page { num: 1, width: 10 }.offset(), 0);
        assert_eq!(Page { num: 3, width: 10 }.offset(), 20);
    }

    #[test]
    fn missing_page_means_first() {
        let page = PageQuery::default().resolve(25, 10).unwrap();
        assert_eq!(page.num, 1);
    }

    #[test]
    fn last_resolves_to_final_page() {
        assert_eq!(query("last").resolve(25, 10).unwrap().num, 3);
        assert_eq!(query("last").resolve(0, 10).unwrap().num, 1);
    }

    #[test]
    fn out_of_range_and_garbage_are_not_found() {
        assert!(matches!(query("4").resolve(25, 10), Err(Error::NotFound)));
        assert!(matches!(query("0").resolve(25, 10), Err(Error::NotFound)));
        assert!(matches!(query("two").resolve(25, 10), Err(Error::NotFound)));
        assert!(matches!(query("2").resolve(0, 10), Err(Error::NotFound)));
    }

    #[test]
    fn first_page_of_empty_listing_is_valid() {
        assert_eq!(query("1").resolve(0, 10).unwrap().num, 1);
    }

    #[test]
    fn pagination_links() {
        let info = Pagination::new(Page { num: 2, width: 10 }, 25);
        assert_eq!(info.num_pages, 3);
        assert!(info.has_previous && info.has_next);
        assert_eq!((info.previous, info.next), (1, 3));

        let single = Pagination::new(Page { num: 1, width: 10 }, 4);
        assert!(!single.is_paginated);
    }
}
