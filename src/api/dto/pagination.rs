//! Pagination query parameters.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub page: Option<u32>,

    #[serde(default)]
    pub page_size: Option<u32>,
}

impl PaginationParams {
    /// Validates the parameters and converts them to `(offset, limit)`.
    ///
    /// # Defaults
    ///
    /// - `page`: 1
    /// - `page_size`: 20, at most 100
    pub fn offset_limit(&self) -> Result<(usize, usize), AppError> {
        let page = self.page.unwrap_or(1);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page == 0 {
            return Err(AppError::invalid_field("page", "must be greater than 0"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::invalid_field(
                "page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        let offset = (page as usize - 1) * page_size as usize;
        Ok((offset, page_size as usize))
    }
}

/// Pagination block echoed in list responses.
#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    /// Items on this page.
    pub count: usize,
}

impl PageMeta {
    pub fn new(params: &PaginationParams, count: usize) -> Self {
        Self {
            page: params.page.unwrap_or(1),
            page_size: params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(PaginationParams::default().offset_limit().unwrap(), (0, 20));
    }

    #[test]
    fn test_offset_from_page() {
        let params = PaginationParams {
            page: Some(3),
            page_size: Some(10),
        };
        assert_eq!(params.offset_limit().unwrap(), (20, 10));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let zero_page = PaginationParams {
            page: Some(0),
            page_size: None,
        };
        assert!(zero_page.offset_limit().is_err());

        let huge = PaginationParams {
            page: None,
            page_size: Some(1000),
        };
        assert!(huge.offset_limit().is_err());
    }
}
