pub mod env;

pub use tempfile;

/// Temp directory that lives until the returned guard drops.
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// SQLite URL for a database file under `root`, created on first connect.
pub fn sqlite_url(root: &std::path::Path, name: &str) -> String {
    format!("sqlite://{}?mode=rwc", root.join(name).display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_url_points_into_root() {
        let tmp = temp_dir();
        let url = sqlite_url(tmp.path(), "db.sqlite");
        assert!(url.starts_with("sqlite://"));
        assert!(url.ends_with("db.sqlite?mode=rwc"));
        assert!(url.contains(tmp.path().to_str().unwrap()));
    }
}
