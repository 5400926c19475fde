//! Server configuration loaded from environment variables.

use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

/// Runtime settings for the HTTP server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Interface to bind (from VERSIONS_HOST)
    pub host: String,
    /// Port to bind (from VERSIONS_PORT)
    pub port: u16,
    /// SQLite database file (from VERSIONS_DATABASE)
    pub database: PathBuf,
    /// Allowed CORS origins (from VERSIONS_CORS_ORIGINS, comma-separated).
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("VERSIONS_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("VERSIONS_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("VERSIONS_PORT is not a valid port: {raw}"))?,
            None => DEFAULT_PORT,
        };

        let database = match lookup("VERSIONS_DATABASE") {
            Some(path) => PathBuf::from(path),
            None => default_database_path()?,
        };

        let cors_origins = lookup("VERSIONS_CORS_ORIGINS").map(|raw| parse_origins(&raw));

        Ok(Self {
            host,
            port,
            database,
            cors_origins,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Platform data directory, e.g. `~/.local/share/versions/versions.db` on Linux.
pub fn default_database_path() -> anyhow::Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "versions")
        .context("Could not determine data directory")?;
    Ok(dirs.data_dir().join("versions.db"))
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
