use axum::http::{HeaderMap, header};

/// Scheme and host of the server as seen by the client, used to turn stored
/// image paths into absolute URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServingOrigin {
    pub scheme: String,
    pub host: String,
}

impl ServingOrigin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    /// Resolves the origin of a request. Forwarding headers win over `Host`;
    /// the defaults apply when the request carries neither.
    pub fn from_headers(headers: &HeaderMap, default_scheme: &str, default_host: &str) -> Self {
        let scheme = header_value(headers, "x-forwarded-proto").unwrap_or(default_scheme);
        let host = header_value(headers, "x-forwarded-host")
            .or_else(|| header_value(headers, header::HOST.as_str()))
            .unwrap_or(default_host);
        Self::new(scheme, host)
    }

    pub fn image_url(&self, stored_path: &str) -> String {
        format!(
            "{}://{}/{}",
            self.scheme,
            self.host,
            stored_path.trim_start_matches('/')
        )
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        // Proxies may append a list; the first entry is the client-facing one.
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn image_url_joins_without_double_slash() {
        let origin = ServingOrigin::new("http", "localhost:5000");
        assert_eq!(origin.image_url("/uploads/a.png"), "http://localhost:5000/uploads/a.png");
        assert_eq!(origin.image_url("uploads/a.png"), "http://localhost:5000/uploads/a.png");
    }

    #[test]
    fn host_header_is_used_when_present() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("blog.test"));
        let origin = ServingOrigin::from_headers(&headers, "http", "fallback:1");
        assert_eq!(origin, ServingOrigin::new("http", "blog.test"));
    }

    #[test]
    fn forwarded_headers_take_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:5000"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("blog.example.com, proxy"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        let origin = ServingOrigin::from_headers(&headers, "http", "fallback:1");
        assert_eq!(origin, ServingOrigin::new("https", "blog.example.com"));
    }

    #[test]
    fn defaults_apply_without_headers() {
        let origin = ServingOrigin::from_headers(&HeaderMap::new(), "http", "localhost:5000");
        assert_eq!(origin, ServingOrigin::new("http", "localhost:5000"));
    }
}
