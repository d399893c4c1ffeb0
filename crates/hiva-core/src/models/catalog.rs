//! Flattened product catalog with search and pagination.

use serde::Serialize;

use super::{Company, Item};

/// Products shown per page unless the caller asks otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One sellable item together with the company that sells it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub company_name: String,
    pub item: Item,
}

impl CatalogEntry {
    /// Flatten every company's items, keeping company order then item order.
    pub fn flatten(companies: Vec<Company>) -> Vec<CatalogEntry> {
        companies
            .into_iter()
            .flat_map(|company| {
                let company_name = company.name;
                company.items.into_iter().map(move |item| CatalogEntry {
                    company_name: company_name.clone(),
                    item,
                })
            })
            .collect()
    }
}

/// Search term plus page selection. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub search: String,
    pub page: usize,
    pub page_size: usize,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub entries: Vec<CatalogEntry>,
    /// Entries matching the search across all pages
    pub total_matches: usize,
    pub page: usize,
    pub page_count: usize,
}

impl CatalogQuery {
    pub fn search(mut self, term: &str) -> Self {
        self.search = term.to_string();
        self.page = 1;
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self.page = 1;
        self
    }

    /// Case-insensitive substring match on the item name.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        let needle = self.search.trim().to_lowercase();
        needle.is_empty() || entry.item.name.to_lowercase().contains(&needle)
    }

    /// Filter and cut one page. A page past the end is empty.
    pub fn apply(&self, entries: &[CatalogEntry]) -> CatalogPage {
        let matching: Vec<&CatalogEntry> = entries.iter().filter(|e| self.matches(e)).collect();
        let page_size = self.page_size.max(1);
        let page = self.page.max(1);
        let start = (page - 1).saturating_mul(page_size);

        CatalogPage {
            entries: matching
                .iter()
                .skip(start)
                .take(page_size)
                .map(|e| (*e).clone())
                .collect(),
            total_matches: matching.len(),
            page,
            page_count: matching.len().div_ceil(page_size),
        }
    }
}
