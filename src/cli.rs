//! Command-line flags.
//!
//! Flags override whatever the config file says.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{AppConfig, DEFAULT_CONFIG_FILE};

/// Estimate market prices of items from eBay auction listings
#[derive(Debug, Parser)]
#[command(name = "pricewatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML config file (optional)
    #[arg(short, long, env = "PRICEWATCH_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Text file of line-separated search queries
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Interval in minutes between scans (ignored in test mode)
    #[arg(short, long)]
    pub interval: Option<u32>,

    /// Scan once immediately and exit
    #[arg(short, long)]
    pub test: bool,

    /// Directory for result files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

impl Cli {
    /// Apply explicitly given flags on top of `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.path {
            config.items_path = path.clone();
        }
        if let Some(interval) = self.interval {
            config.schedule.interval_minutes = interval;
        }
        if self.test {
            config.schedule.test_mode = true;
        }
        if let Some(dir) = &self.output_dir {
            config.storage.output_dir = dir.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::try_parse_from(["pricewatch"]).unwrap();
        assert!(cli.path.is_none());
        assert!(cli.interval.is_none());
        assert!(!cli.test);

        let mut cfg = AppConfig::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_cli_short_flags_override() {
        let cli =
            Cli::try_parse_from(["pricewatch", "-p", "gpus.txt", "-i", "5", "-t", "-o", "out"])
                .unwrap();
        let mut cfg = AppConfig::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.items_path, PathBuf::from("gpus.txt"));
        assert_eq!(cfg.schedule.interval_minutes, 5);
        assert!(cfg.schedule.test_mode);
        assert_eq!(cfg.storage.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_cli_long_flags() {
        let cli = Cli::try_parse_from([
            "pricewatch",
            "--config",
            "alt.toml",
            "--path",
            "items.txt",
            "--interval",
            "30",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
        assert_eq!(cli.interval, Some(30));
    }

    #[test]
    fn test_cli_rejects_non_numeric_interval() {
        assert!(Cli::try_parse_from(["pricewatch", "-i", "soon"]).is_err());
    }
}
