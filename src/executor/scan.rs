use crate::storage::catalog::TableCatalog;
use crate::types::PageNumber;
use crate::types::error::Result;
use crate::types::row::Row;

/// Page-granular row source. The page range is fixed when the scanner
/// is created (0 through the page holding the highest allocated id).
pub trait Scanner {
    /// Live rows of the next page in scan order, or `None` at the end.
    fn next_page(&mut self) -> Result<Option<Vec<Row>>>;

    fn reset(&mut self);
}

/// Sequential full-table scanner over one open catalog.
pub struct PageScanner<'a> {
    catalog: &'a TableCatalog,
    current: PageNumber,
    page_count: PageNumber,
}

impl<'a> PageScanner<'a> {
    pub fn new(catalog: &'a TableCatalog) -> Self {
        Self {
            catalog,
            current: 0,
            page_count: catalog.page_count(),
        }
    }
}

impl Scanner for PageScanner<'_> {
    fn next_page(&mut self) -> Result<Option<Vec<Row>>> {
        if self.current >= self.page_count {
            return Ok(None);
        }
        let page = self.catalog.read_page(self.current)?;
        self.current += 1;
        Ok(Some(page.live_rows().cloned().collect()))
    }

    fn reset(&mut self) {
        self.current = 0;
    }
}
