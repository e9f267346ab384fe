//! Layered settings
//!
//! Built-in defaults, then the optional settings file, then `PERFDASH__*`
//! environment variables (`__` separates nested keys, e.g.
//! `PERFDASH__GCS__BUCKET`), then command-line flags.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use perfdash_api::ApiConfig;
use perfdash_core::DownloaderOptions;
use perfdash_storage::{GcsConfig, StoreConfig};

use crate::cli::args::Args;
use crate::cli::{Error, Result};

const ENV_PREFIX: &str = "PERFDASH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    Local,
    Gcs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSettings {
    pub root: PathBuf,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub address: String,
    pub www: bool,
    pub www_dir: PathBuf,
    pub mode: StoreMode,
    pub default_builds_count: usize,
    pub override_builds_count: bool,
    pub fetch_all_builds: bool,
    pub refresh_period_secs: u64,
    pub config_paths: Vec<PathBuf>,
    pub job_config_dirs: Vec<PathBuf>,
    pub local: LocalSettings,
    pub gcs: GcsConfig,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let options = DownloaderOptions::default();
        Self {
            address: ":8080".to_string(),
            www: false,
            www_dir: PathBuf::from("www"),
            mode: StoreMode::Local,
            default_builds_count: options.default_builds_count,
            override_builds_count: options.override_builds_count,
            fetch_all_builds: options.fetch_all_builds,
            refresh_period_secs: 600,
            config_paths: Vec::new(),
            job_config_dirs: Vec::new(),
            local: LocalSettings::default(),
            gcs: GcsConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

fn path_strings(paths: &[PathBuf]) -> Option<Vec<String>> {
    if paths.is_empty() {
        return None;
    }
    Some(
        paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect(),
    )
}

fn path_string(path: Option<&PathBuf>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}

impl Settings {
    /// Resolve the settings for `args` against the process environment.
    pub fn load(args: &Args) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);

        if let Some(path) = &args.settings {
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }

        builder = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("config_paths")
                    .with_list_parse_key("job_config_dirs"),
            )
            .set_override_option("address", args.address.clone())?
            .set_override_option("www", args.www.then_some(true))?
            .set_override_option("www_dir", path_string(args.www_dir.as_ref()))?
            .set_override_option("mode", args.mode.map(|m| m.as_str()))?
            .set_override_option("local.root", path_string(args.local_root.as_ref()))?
            .set_override_option("gcs.bucket", args.bucket.clone())?
            .set_override_option("config_paths", path_strings(&args.config_paths))?
            .set_override_option("job_config_dirs", path_strings(&args.job_config_dirs))?
            .set_override_option(
                "default_builds_count",
                args.builds_count.map(|n| n as i64),
            )?
            .set_override_option("override_builds_count", args.force_builds.then_some(true))?
            .set_override_option("fetch_all_builds", args.all_builds.then_some(true))?
            .set_override_option("refresh_period_secs", args.period_secs.map(|n| n as i64))?
            .set_override_option("logging.format", args.log_format.map(|f| f.as_str()))?;

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.refresh_period_secs == 0 {
            return Err(Error::InvalidSettings(
                "refresh_period_secs must be positive".to_string(),
            ));
        }
        if self.mode == StoreMode::Gcs && self.gcs.bucket.is_empty() {
            return Err(Error::InvalidSettings(
                "gcs mode needs gcs.bucket".to_string(),
            ));
        }
        Ok(())
    }

    pub fn downloader_options(&self) -> DownloaderOptions {
        DownloaderOptions {
            default_builds_count: self.default_builds_count,
            override_builds_count: self.override_builds_count,
            fetch_all_builds: self.fetch_all_builds,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        match self.mode {
            StoreMode::Local => StoreConfig::Local {
                root: self.local.root.clone(),
            },
            StoreMode::Gcs => StoreConfig::Gcs(self.gcs.clone()),
        }
    }

    pub fn api_config(&self) -> Result<ApiConfig> {
        let config = ApiConfig {
            www_dir: self.www.then(|| self.www_dir.clone()),
            ..ApiConfig::default()
        };
        config
            .with_address(&self.address)
            .map_err(|e| Error::InvalidSettings(e.to_string()))
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_period_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["perfdash"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_round_trip_through_config() {
        let settings = Settings::load(&args(&[])).unwrap();
        assert_eq!(settings.default_builds_count, 100);
        assert_eq!(settings.refresh_period(), Duration::from_secs(600));
        assert_eq!(settings.mode, StoreMode::Local);
        assert!(settings.api_config().unwrap().www_dir.is_none());
    }

    #[test]
    fn test_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("perfdash.yaml");
        std::fs::write(
            &file,
            "mode: gcs\ndefault_builds_count: 10\nwww: true\ngcs:\n  bucket: ci-logs\n  logs_path: pr-logs\n",
        )
        .unwrap();

        let settings = Settings::load(&args(&[
            "--settings",
            file.to_str().unwrap(),
            "--builds",
            "5",
            "--address",
            "127.0.0.1:9000",
        ]))
        .unwrap();

        assert_eq!(settings.default_builds_count, 5);
        assert_eq!(settings.gcs.bucket, "ci-logs");
        assert_eq!(settings.gcs.logs_path, "pr-logs");
        assert_eq!(settings.gcs.endpoint, perfdash_storage::DEFAULT_GCS_ENDPOINT);
        assert!(matches!(settings.store_config(), StoreConfig::Gcs(_)));

        let api = settings.api_config().unwrap();
        assert_eq!(api.port, 9000);
        assert_eq!(api.www_dir, Some(PathBuf::from("www")));
    }

    #[test]
    fn test_missing_settings_file_is_an_error() {
        assert!(Settings::load(&args(&["--settings", "/nonexistent/perfdash.toml"])).is_err());
    }

    #[test]
    fn test_rejects_zero_period() {
        assert!(matches!(
            Settings::load(&args(&["--period-secs", "0"])),
            Err(Error::InvalidSettings(_))
        ));
    }
}
