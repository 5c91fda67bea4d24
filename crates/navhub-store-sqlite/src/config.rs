use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "file:./dev.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub database_url: String,
}

impl DatabaseConfig {
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Read `DATABASE_URL`, falling back to [`DEFAULT_DATABASE_URL`].
    #[must_use]
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        Self { database_url }
    }

    #[must_use]
    pub fn is_sqlite(&self) -> bool {
        self.database_url.starts_with("file:")
    }

    /// Filesystem path of a `file:` URL; `None` for any other database.
    #[must_use]
    pub fn sqlite_path(&self) -> Option<PathBuf> {
        let rest = self.database_url.strip_prefix("file:")?;
        let path = rest.split_once('?').map_or(rest, |(path, _query)| path);
        if path.is_empty() {
            return None;
        }
        Some(PathBuf::from(path))
    }
}
