//! Filesystem naming helpers for exported messages.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Subject portion of an export directory name is capped at this length
/// to respect filesystem path limits.
pub const SUBJECT_NAME_LEN: usize = 50;

/// Directory name for one exported message: `{date}_{subject}`.
pub fn item_dir_name(received: &DateTime<Utc>, subject: &str) -> String {
    let date = received.format("%Y%m%d_%H%M%S").to_string();
    let subject = sanitize_path_segment(subject, SUBJECT_NAME_LEN);
    format!("{date}_{subject}")
}

/// Sanitize a string for use as a path segment.
///
/// Replaces everything outside alphanumerics, `-`, `.`, `_`, `@` with `_`
/// and truncates to `max_len` characters.
pub fn sanitize_path_segment(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

/// If `path` already exists, append a counter to make it unique.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    // Fallback — very unlikely
    parent.join(format!("{stem}_dup.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_replaces_illegal_characters() {
        assert_eq!(sanitize_path_segment("a/b:c*d", 50), "a_b_c_d");
        assert_eq!(sanitize_path_segment("hello world", 50), "hello_world");
        assert_eq!(sanitize_path_segment("user@example.com", 50), "user@example.com");
        assert_eq!(sanitize_path_segment("", 50), "unknown");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "x".repeat(120);
        assert_eq!(sanitize_path_segment(&long, SUBJECT_NAME_LEN).len(), 50);
    }

    #[test]
    fn test_item_dir_name_format() {
        let received = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 5).unwrap();
        assert_eq!(
            item_dir_name(&received, "Budget: Q1/Q2 review?"),
            "20240301_093005_Budget__Q1_Q2_review_"
        );
    }

    #[test]
    fn test_unique_path_appends_counter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"x").expect("write");

        let next = unique_path(&path);
        assert_eq!(next, dir.path().join("report_1.pdf"));

        std::fs::write(&next, b"y").expect("write");
        assert_eq!(unique_path(&path), dir.path().join("report_2.pdf"));
    }

    #[test]
    fn test_unique_path_without_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("20240301_093005_subject");
        std::fs::create_dir(&path).expect("mkdir");
        assert_eq!(
            unique_path(&path),
            dir.path().join("20240301_093005_subject_1")
        );
    }
}
