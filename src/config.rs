use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::cli::Cli;
use crate::sync::SyncOptions;
use crate::types::{Domain, TimestampFallback};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Either --username and --password or --creds-file must be given")]
    MissingCredentials,

    #[error("--username requires --password (or ICLOUD_PASSWORD)")]
    MissingUsername,

    #[error("--password requires --username")]
    MissingPassword,

    #[error("--creds-file cannot be combined with --username or --password")]
    ConflictingCredentials,

    #[error("Failed to read credentials file {}: {source}", .path.display())]
    CredsFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid credentials file {}: {source}", .path.display())]
    CredsFileParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("{what} {} does not exist or is not a directory", .path.display())]
    NotADirectory { what: &'static str, path: PathBuf },

    #[error("Cannot determine the current directory: {0}")]
    CurrentDir(std::io::Error),
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Load `username` and `password` from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::CredsFileRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::CredsFileParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Pick the single credentials source. Direct flags and a credentials file
/// are mutually exclusive.
fn resolve_credentials(
    username: Option<String>,
    password: Option<String>,
    creds_file: Option<&Path>,
) -> Result<Credentials, ConfigError> {
    match (username, password, creds_file) {
        (None, None, Some(path)) => Credentials::from_yaml_file(path),
        (_, _, Some(_)) => Err(ConfigError::ConflictingCredentials),
        (Some(username), Some(password), None) => Ok(Credentials { username, password }),
        (None, Some(_), None) => Err(ConfigError::MissingUsername),
        (Some(_), None, None) => Err(ConfigError::MissingPassword),
        (None, None, None) => Err(ConfigError::MissingCredentials),
    }
}

/// Application configuration.
pub struct Config {
    pub credentials: Credentials,
    pub directory: PathBuf,
    pub link_directory: Option<PathBuf>,
    pub domain: Domain,
    pub timestamp_fallback: TimestampFallback,
    pub skip_existing: bool,
    pub remove_missing: bool,
    pub link_existing: bool,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.credentials.username)
            .field("password", &"<redacted>")
            .field("directory", &self.directory)
            .field("link_directory", &self.link_directory)
            .field("domain", &self.domain)
            .field("skip_existing", &self.skip_existing)
            .field("remove_missing", &self.remove_missing)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn require_dir(what: &'static str, path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_dir() {
        Ok(path)
    } else {
        Err(ConfigError::NotADirectory { what, path })
    }
}

impl Config {
    /// Validate the command line. Nothing here touches the network.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let creds_file = cli.creds_file.as_deref().map(expand_tilde);
        let credentials = resolve_credentials(cli.username, cli.password, creds_file.as_deref())?;

        let directory = match cli.download_dir {
            Some(d) => expand_tilde(&d),
            None => std::env::current_dir().map_err(ConfigError::CurrentDir)?,
        };
        let directory = require_dir("Download directory", directory)?;
        let link_directory = cli
            .link_dir
            .map(|l| require_dir("Link directory", expand_tilde(&l)))
            .transpose()?;

        Ok(Self {
            credentials,
            directory,
            link_directory,
            domain: cli.domain,
            timestamp_fallback: cli.timestamp_fallback,
            skip_existing: cli.skip_exists,
            remove_missing: cli.remove_missing,
            link_existing: cli.link_existing,
            no_progress_bar: cli.no_progress_bar,
        })
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            directory: self.directory.clone(),
            link_directory: self.link_directory.clone(),
            skip_existing: self.skip_existing,
            purge: self.remove_missing,
            link_existing: self.link_existing,
            timestamp_fallback: self.timestamp_fallback,
        }
    }
}
