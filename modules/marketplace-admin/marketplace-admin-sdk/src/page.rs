use serde::{Deserialize, Serialize};

/// One page of a list after search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matching items across all pages.
    pub total: usize,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    /// Set when the list could not be loaded and degraded to empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn empty(page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            page_size,
            total_pages: 0,
            notice: None,
        }
    }

    #[must_use]
    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            notice: self.notice,
        }
    }
}
