/// Small helpers shared by the registry, fetcher and exporters

/// URL utilities for feeds and items
pub mod url {
    use url::{form_urlencoded, Url};

    /// Extract domain from URL
    pub fn extract_domain(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.domain().map(|d| d.to_string()))
    }

    /// Absolute http(s) URL with a host
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => (url.scheme() == "http" || url.scheme() == "https") && url.host().is_some(),
            Err(_) => false,
        }
    }

    /// Form-encode a query value; spaces become `+`.
    pub fn encode_query(value: &str) -> String {
        form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }
}

/// File naming helpers for exports
pub mod files {
    use chrono::{DateTime, TimeZone};
    use std::fmt::Display;

    pub fn timestamp_suffix<Tz: TimeZone>(at: &DateTime<Tz>) -> String
    where
        Tz::Offset: Display,
    {
        at.format("%Y%m%d_%H%M%S").to_string()
    }

    /// Keep ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
    pub fn sanitize_component(name: &str) -> String {
        let cleaned: String = name
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();

        if cleaned.is_empty() {
            "feeds".to_string()
        } else {
            cleaned
        }
    }
}
