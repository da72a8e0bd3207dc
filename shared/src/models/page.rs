//! Pagination helpers

use serde::{Deserialize, Serialize};

/// Page window computed from 1-based `page` and `limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Clamp raw query values into a valid window
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }

    pub fn total_pages(&self, total: u64) -> u32 {
        total.div_ceil(u64::from(self.limit)) as u32
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination block returned next to a page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total: u64,
    pub limit: u32,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            current_page: request.page,
            total_pages: request.total_pages(total),
            total,
            limit: request.limit,
        }
    }
}
