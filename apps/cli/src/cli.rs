//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use keyrot_log::Format;
use serde::{Deserialize, Serialize};

/// Rotate the access keys recorded in an AWS shared credentials file
///
/// Each selected profile gets a fresh access key; the old key is deactivated
/// once the file holds the new one. At most two keys exist per IAM user at
/// any time.
#[derive(Parser, Debug)]
#[command(name = "keyrot", version, about, long_about = None)]
pub struct Cli {
    /// Path to the AWS credentials file [default: ~/.aws/credentials]
    #[arg(short, long, value_name = "PATH")]
    pub credentials: Option<PathBuf>,

    /// Comma separated profiles to rotate; all others are left alone
    #[arg(long, value_delimiter = ',', conflicts_with = "exclude")]
    pub include: Vec<String>,

    /// Comma separated profiles to leave alone; all others are rotated
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Configuration file [default: $XDG_CONFIG_HOME/keyrot/config.toml]
    #[arg(long, env = "KEYROT_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Signing region for IAM requests
    #[arg(long)]
    pub region: Option<String>,

    /// Alternative IAM endpoint (LocalStack and similar)
    #[arg(long, value_name = "URL")]
    pub endpoint_url: Option<String>,

    /// Deadline for each remote call, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// List and plan only; change nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Report format on stdout
    #[arg(long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Log filter, e.g. `debug` or `keyrot_rotation=trace` [env: KEYROT_LOG]
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Log format on stderr [env: KEYROT_LOG_FORMAT]
    #[arg(long, value_parser = parse_log_format)]
    pub log_format: Option<Format>,
}

/// Report format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn parse_log_format(s: &str) -> Result<Format, String> {
    s.parse().map_err(|e: keyrot_log::LogError| e.to_string())
}

impl Cli {
    /// Logging configuration: environment first, flags on top
    pub fn log_config(&self) -> keyrot_log::Config {
        let mut config = keyrot_log::Config::from_env();
        if let Some(level) = &self.log_level {
            config.level.clone_from(level);
        }
        if let Some(format) = self.log_format {
            config.format = format;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_lists_split_on_commas() {
        let cli = Cli::try_parse_from(["keyrot", "--include", "dev,prod", "--include", "qa"]).unwrap();
        assert_eq!(cli.include, vec!["dev", "prod", "qa"]);
    }

    #[test]
    fn test_include_and_exclude_conflict() {
        let err = Cli::try_parse_from(["keyrot", "--include", "a", "--exclude", "b"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_log_format_flag() {
        let cli = Cli::try_parse_from(["keyrot", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, Some(Format::Json));
        assert!(Cli::try_parse_from(["keyrot", "--log-format", "xml"]).is_err());
    }
}
