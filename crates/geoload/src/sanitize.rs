//! Helpers for keeping paths and remote payloads out of logs and spans.

use std::path::Path;

/// Longest remote error body kept in a log line.
pub const MAX_ERROR_BODY_CHARS: usize = 512;

/// Returns only the file name component of a path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Collapses whitespace and cuts `body` to [`MAX_ERROR_BODY_CHARS`] characters.
pub fn truncate_body(body: &str) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    cut.push_str("...");
    cut
}

/// Strips the query string from a URL so upload tokens and object names
/// stay out of logs.
pub fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_path_returns_filename() {
        assert_eq!(redact_path(Path::new("/home/user/data/parcels.zip")), "parcels.zip");
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }

    #[test]
    fn test_truncate_short_body_unchanged() {
        assert_eq!(truncate_body("  table   not\nfound "), "table not found");
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "é".repeat(MAX_ERROR_BODY_CHARS + 10);
        let cut = truncate_body(&body);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), MAX_ERROR_BODY_CHARS + 3);
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(
            strip_query("https://storage.example/upload/b/o?uploadType=media&name=x"),
            "https://storage.example/upload/b/o"
        );
        assert_eq!(strip_query("https://sink.example/jobs"), "https://sink.example/jobs");
    }
}
