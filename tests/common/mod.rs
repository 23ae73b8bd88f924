//! Shared fixtures for integration tests
#![allow(dead_code)]

use gleaner::config::FetchConfig;
use gleaner::utils::retry::RetryConfig;

/// Fetch configuration suitable for mock servers
pub fn fetch_config() -> FetchConfig {
    FetchConfig {
        request_timeout_secs: 5,
        rate_limit: 200,
        max_chars_per_item: 8000,
    }
}

/// Retry policy with millisecond delays so tests stay fast
pub fn fast_retry() -> RetryConfig {
    RetryConfig::with_delays(2, 1, 10)
}

/// Build a minimal RSS payload with the given (title, url, description) items
pub fn rss_feed(items: &[(&str, &str, &str)]) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>https://example.com/</link>
"#,
    );

    for (title, url, description) in items {
        body.push_str(&format!(
            r#"    <item>
      <title>{title}</title>
      <link>{url}</link>
      <guid>{url}</guid>
      <pubDate>Mon, 06 Jan 2025 10:00:00 GMT</pubDate>
      <description>{description}</description>
    </item>
"#
        ));
    }

    body.push_str("  </channel>\n</rss>\n");
    body
}

/// A description long enough that the extractor keeps it without
/// fetching the entry page
pub fn long_description() -> String {
    "This embedded description easily clears the trivial-content threshold. ".repeat(4)
}
