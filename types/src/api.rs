use serde::{Deserialize, Serialize};

/// Response envelope shared by all endpoints. Domain rejections arrive as
/// `success = false` with a human-readable message; transport-level failures
/// are HTTP status codes, a distinct condition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

/// One page of a history listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Query parameters accepted by the history endpoints.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_roundtrip() {
        let ok: ApiResponse<u32> = ApiResponse::ok(7);
        let json = serde_json::to_string(&ok).unwrap();
        assert_eq!(json, r#"{"success":true,"data":7}"#);

        let rejected: ApiResponse<u32> = ApiResponse::rejected("round locked");
        let json = serde_json::to_string(&rejected).unwrap();
        let parsed: ApiResponse<u32> = serde_json::from_str(&json).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.message.as_deref(), Some("round locked"));
        assert!(parsed.data.is_none());
    }

    #[test]
    fn test_page_query_defaults() {
        let query: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 20);
    }
}
