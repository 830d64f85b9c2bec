//! Compile-time build information.

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// `autobattle 0.1.0 (abc1234, 2026-01-01)`
pub fn version_line() -> String {
    format!(
        "autobattle {} ({}, {})",
        env!("CARGO_PKG_VERSION"),
        BUILD_COMMIT,
        BUILD_DATE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_commit_format() {
        // 7 chars or "unknown"
        assert!(BUILD_COMMIT == "unknown" || BUILD_COMMIT.len() == 7);
    }

    #[test]
    fn test_build_date_format() {
        // YYYY-MM-DD
        assert!(BUILD_DATE.len() == 10 || BUILD_DATE == "unknown");
    }

    #[test]
    fn test_version_line_mentions_package() {
        let line = version_line();
        assert!(line.starts_with("autobattle "));
        assert!(line.contains(BUILD_COMMIT));
    }
}
