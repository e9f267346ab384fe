//! CLI argument parsing
//!
//! Every flag is optional; anything given here overrides the settings file
//! and the `PERFDASH__*` environment.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Local,
    Gcs,
}

impl ModeArg {
    pub fn as_str(self) -> &'static str {
        match self {
            ModeArg::Local => "local",
            ModeArg::Gcs => "gcs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl LogFormatArg {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFormatArg::Text => "text",
            LogFormatArg::Json => "json",
        }
    }
}

/// Parsed CLI arguments
#[derive(Debug, Clone, Parser)]
#[command(
    name = "perfdash",
    version,
    about = "Aggregates CI performance-test artifacts and serves them to a trend dashboard"
)]
pub struct Args {
    /// Settings file (TOML, YAML or JSON)
    #[arg(long, env = "PERFDASH_SETTINGS", value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// The address to serve web data on, e.g. `:8080`
    #[arg(long)]
    pub address: Option<String>,

    /// Serve the dashboard's static files at the root of the web server
    #[arg(long)]
    pub www: bool,

    /// Directory of the dashboard's static files
    #[arg(long = "dir", value_name = "DIR")]
    pub www_dir: Option<PathBuf>,

    /// Where build artifacts are read from
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Root directory for `--mode local`
    #[arg(long, value_name = "DIR")]
    pub local_root: Option<PathBuf>,

    /// Bucket for `--mode gcs`
    #[arg(long)]
    pub bucket: Option<String>,

    /// Test description file; repeatable
    #[arg(long = "config-path", value_name = "FILE")]
    pub config_paths: Vec<PathBuf>,

    /// Directory of CI job definitions carrying perfdash annotations; repeatable
    #[arg(long = "job-config-dir", value_name = "DIR")]
    pub job_config_dirs: Vec<PathBuf>,

    /// Number of builds to read per job unless a job sets its own
    #[arg(long = "builds", value_name = "N")]
    pub builds_count: Option<usize>,

    /// Use `--builds` even for jobs that set their own count
    #[arg(long)]
    pub force_builds: bool,

    /// Read every build of every job
    #[arg(long)]
    pub all_builds: bool,

    /// Seconds between refresh cycles
    #[arg(long, value_name = "SECS")]
    pub period_secs: Option<u64>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormatArg>,

    /// Run a single refresh cycle, log its statistics and exit
    #[arg(long)]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["perfdash"]).unwrap();
        assert!(args.settings.is_none());
        assert!(!args.www);
        assert!(!args.once);
        assert!(args.config_paths.is_empty());
    }

    #[test]
    fn test_repeatable_and_typed_flags() {
        let args = Args::try_parse_from([
            "perfdash",
            "--config-path",
            "a.yaml",
            "--config-path",
            "b.yaml",
            "--job-config-dir",
            "jobs",
            "--mode",
            "gcs",
            "--builds",
            "20",
            "--force-builds",
            "--dir",
            "static",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(
            args.config_paths,
            vec![PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]
        );
        assert_eq!(args.job_config_dirs, vec![PathBuf::from("jobs")]);
        assert_eq!(args.mode, Some(ModeArg::Gcs));
        assert_eq!(args.builds_count, Some(20));
        assert!(args.force_builds);
        assert_eq!(args.www_dir, Some(PathBuf::from("static")));
        assert_eq!(args.log_format, Some(LogFormatArg::Json));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Args::try_parse_from(["perfdash", "--mode", "s3"]).is_err());
    }
}
