use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Sorts a OneDrive photos folder into /Camera and /Camera - Video, one folder
/// per day.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Settings file (JSON, or TOML by extension)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Drive folder to organize (overrides `photos_folder_path`)
    #[arg(short, long, value_name = "PATH")]
    pub source: Option<String>,

    /// Log what would be moved without changing anything on the drive.
    /// Only the first page of a large folder (about 200 items) is covered.
    #[arg(long)]
    pub dry_run: bool,

    /// More logging; repeat for debug output
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            // Keep dependency crates (HTTP client, TLS) out of debug output.
            (false, _) => "drivesort=debug,drivesort_library=debug,drivesort_storage=debug,drivesort_config=debug,info",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["drivesort"], "warn")]
    #[case(&["drivesort", "-q"], "error")]
    #[case(&["drivesort", "-v"], "info")]
    #[case(&["drivesort", "-vv", "--dry-run"], "drivesort=debug,drivesort_library=debug,drivesort_storage=debug,drivesort_config=debug,info")]
    fn test_log_filter(#[case] args: &[&str], #[case] expected: &str) {
        assert_eq!(Cli::parse_from(args).log_filter(), expected);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["drivesort", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from(["drivesort", "--config", "/etc/drivesort.toml", "--source", "/Pictures", "--dry-run"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/drivesort.toml")));
        assert_eq!(cli.source.as_deref(), Some("/Pictures"));
        assert!(cli.dry_run);
    }

    #[test]
    fn test_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
