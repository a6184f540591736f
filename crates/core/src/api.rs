//! JSON response envelope shared by the storefront and admin APIs.
//!
//! Every endpoint answers with `{"success": true, "data": ...}` or
//! `{"success": false, "message": "..."}`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// Success carrying a message for the user (e.g. "Produk dihapus").
    #[must_use]
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = u32::try_from(total.div_ceil(u64::from(per_page))).unwrap_or(u32::MAX);
        Self {
            items,
            page,
            per_page,
            total,
            total_pages,
        }
    }

    /// SQL `OFFSET` for a 1-based page.
    #[must_use]
    pub fn offset(page: u32, per_page: u32) -> i64 {
        i64::from(page.saturating_sub(1)) * i64::from(per_page)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": [1, 2]}));
    }

    #[test]
    fn test_error_envelope() {
        let json = serde_json::to_value(ApiResponse::error("Produk tidak ditemukan")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "message": "Produk tidak ditemukan"})
        );
    }

    #[test]
    fn test_page_math() {
        let page = Page::new(vec!["a"; 12], 2, 12, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(Page::<()>::offset(1, 12), 0);
        assert_eq!(Page::<()>::offset(3, 12), 24);
        assert_eq!(Page::<()>::offset(0, 12), 0);

        let empty = Page::<u8>::new(vec![], 1, 12, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
