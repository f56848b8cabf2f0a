//! CLI argument definitions for the Ieum server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Ieum - caregiver chat and wellbeing report backend.
#[derive(Parser, Debug)]
#[command(name = "ieum", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Data directory holding the SQLite database.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > IEUM_CONFIG env var > ~/.ieum/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("IEUM_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > IEUM_PORT env var > config file value > 8080.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("IEUM_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        if config_port != 0 {
            return config_port;
        }
        8080
    }

    /// `--data-dir` override, if given.
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// `--log-level` override, if given.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".ieum").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_flags() {
        let args = CliArgs::try_parse_from([
            "ieum",
            "--config",
            "/etc/ieum.toml",
            "-p",
            "9090",
            "--data-dir",
            "/var/lib/ieum",
            "-l",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/ieum.toml"));
        assert_eq!(args.resolve_port(8080), 9090);
        assert_eq!(args.resolve_data_dir().as_deref(), Some("/var/lib/ieum"));
        assert_eq!(args.resolve_log_level().as_deref(), Some("debug"));
    }

    #[test]
    fn test_no_flags_leaves_overrides_empty() {
        let args = CliArgs::try_parse_from(["ieum"]).unwrap();
        assert!(args.resolve_data_dir().is_none());
        assert!(args.resolve_log_level().is_none());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(CliArgs::try_parse_from(["ieum", "--port", "70000"]).is_err());
    }
}
