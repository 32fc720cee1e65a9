use clap::Parser;

use crate::types::{Domain, TimestampFallback};

#[derive(Parser, Debug)]
#[command(
    name = "icloud-photo-sync",
    version,
    about = "Mirror an iCloud Photos library into a local directory"
)]
pub struct Cli {
    /// Apple ID email address
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// iCloud password.
    /// WARNING: passing via --password is visible in process listings.
    /// Prefer the ICLOUD_PASSWORD environment variable or --creds-file.
    #[arg(short = 'p', long, env = "ICLOUD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// YAML file with `username` and `password` keys (instead of -u/-p)
    #[arg(short = 'c', long)]
    pub creds_file: Option<String>,

    /// Local directory for downloads (default: current directory)
    #[arg(short = 'd', long)]
    pub download_dir: Option<String>,

    /// Directory to populate with hard links (or copies) of synced photos
    #[arg(short = 'l', long)]
    pub link_dir: Option<String>,

    /// Don't re-download photos that already exist locally
    #[arg(short = 's', long)]
    pub skip_exists: bool,

    /// Delete local files that are no longer in iCloud
    #[arg(short = 'r', long)]
    pub remove_missing: bool,

    /// Also link photos skipped because they already exist
    #[arg(long)]
    pub link_existing: bool,

    /// Date to use for files without an embedded creation date
    #[arg(long, value_enum, default_value = "first-item")]
    pub timestamp_fallback: TimestampFallback,

    /// iCloud domain (com or cn)
    #[arg(long, value_enum, default_value = "com")]
    pub domain: Domain,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,

    /// Debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from([
            "icloud-photo-sync",
            "-u",
            "me@example.com",
            "-p",
            "hunter2",
            "-d",
            "/photos",
            "-l",
            "/links",
            "-s",
            "-r",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.username.as_deref(), Some("me@example.com"));
        assert_eq!(cli.password.as_deref(), Some("hunter2"));
        assert_eq!(cli.download_dir.as_deref(), Some("/photos"));
        assert_eq!(cli.link_dir.as_deref(), Some("/links"));
        assert!(cli.skip_exists);
        assert!(cli.remove_missing);
        assert!(cli.verbose);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["icloud-photo-sync", "-c", "creds.yaml"]).unwrap();
        assert_eq!(cli.creds_file.as_deref(), Some("creds.yaml"));
        assert!(!cli.skip_exists);
        assert!(!cli.remove_missing);
        assert!(!cli.link_existing);
        assert_eq!(cli.timestamp_fallback, TimestampFallback::FirstItem);
        assert_eq!(cli.domain, Domain::Com);
    }

    #[test]
    fn test_timestamp_fallback_item() {
        let cli =
            Cli::try_parse_from(["icloud-photo-sync", "--timestamp-fallback", "item"]).unwrap();
        assert_eq!(cli.timestamp_fallback, TimestampFallback::Item);
    }

    #[test]
    fn test_rejects_unknown_domain() {
        assert!(Cli::try_parse_from(["icloud-photo-sync", "--domain", "uk"]).is_err());
    }
}
