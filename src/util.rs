//! Shared helpers for the keygate HTTP layer.

use axum::http::HeaderMap;

/// Extract the acting administrator's name from the `x-admin-name` header.
///
/// Admin routes record who performed a mutation in lifecycle history. The
/// header is optional; absent or non-UTF-8 values fall back to the system
/// actor downstream.
pub fn extract_admin_actor(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-admin-name")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_admin_actor() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_admin_actor(&headers), None);

        headers.insert("x-admin-name", HeaderValue::from_static("  alice "));
        assert_eq!(extract_admin_actor(&headers), Some("alice".to_string()));

        headers.insert("x-admin-name", HeaderValue::from_static("   "));
        assert_eq!(extract_admin_actor(&headers), None);
    }
}
