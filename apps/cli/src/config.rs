//! Layered settings: defaults → config file → `KEYROT_*` env → flags

use std::path::PathBuf;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format as _, Serialized, Toml};
use keyrot_rotation::ConfigurationError;
use keyrot_rotation::orchestrator::ProfileSelection;
use keyrot_rotation::providers::IamAuthorityConfig;
use keyrot_rotation::rotation::RotationOptions;
use serde::{Deserialize, Deserializer, Serialize};

use crate::cli::{Cli, OutputFormat};

const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=300;

/// Effective settings of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Credentials file; `~/.aws/credentials` when unset
    pub credentials: Option<PathBuf>,
    #[serde(deserialize_with = "profile_list")]
    pub include: Vec<String>,
    #[serde(deserialize_with = "profile_list")]
    pub exclude: Vec<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub timeout_secs: u64,
    pub dry_run: bool,
    pub output: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials: None,
            include: Vec::new(),
            exclude: Vec::new(),
            region: None,
            endpoint_url: None,
            timeout_secs: 30,
            dry_run: false,
            output: OutputFormat::Text,
        }
    }
}

/// Flags given on the command line; unset ones do not override lower layers
#[derive(Debug, Default, Serialize)]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    credentials: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    include: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclude: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<OutputFormat>,
}

impl From<&Cli> for Overrides {
    fn from(cli: &Cli) -> Self {
        Self {
            credentials: cli.credentials.clone(),
            include: cli.include.clone(),
            exclude: cli.exclude.clone(),
            region: cli.region.clone(),
            endpoint_url: cli.endpoint_url.clone(),
            timeout_secs: cli.timeout_secs,
            dry_run: cli.dry_run,
            output: cli.output,
        }
    }
}

/// Accept `["a", "b"]` as well as `"a,b"` (the form env variables take)
fn profile_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum List {
        Joined(String),
        Items(Vec<String>),
    }

    let items = match List::deserialize(deserializer)? {
        List::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        List::Items(items) => items,
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("keyrot").join("config.toml"))
}

impl Settings {
    /// Merge every layer
    ///
    /// An explicitly named config file must exist; the default one is
    /// optional.
    pub fn load(cli: &Cli) -> Result<Self, ConfigurationError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match &cli.config {
            Some(path) if !path.is_file() => {
                return Err(ConfigurationError::InvalidValue {
                    field: "config".into(),
                    reason: format!("{} does not exist", path.display()),
                });
            }
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                if let Some(path) = default_config_path() {
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        let settings: Self = figment
            .merge(Env::prefixed("KEYROT_").ignore(&["LOG", "LOG_FORMAT", "CONFIG"]))
            .merge(Serialized::defaults(Overrides::from(cli)))
            .extract()
            .map_err(|e| ConfigurationError::InvalidValue {
                field: if e.path.is_empty() {
                    "settings".to_string()
                } else {
                    e.path.join(".")
                },
                reason: e.kind.to_string(),
            })?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !TIMEOUT_RANGE.contains(&self.timeout_secs) {
            return Err(ConfigurationError::InvalidValue {
                field: "timeout_secs".into(),
                reason: format!(
                    "must be between {} and {} seconds, got {}",
                    TIMEOUT_RANGE.start(),
                    TIMEOUT_RANGE.end(),
                    self.timeout_secs
                ),
            });
        }
        self.iam_config().validate()
    }

    pub fn credentials_path(&self) -> Result<PathBuf, ConfigurationError> {
        match &self.credentials {
            Some(path) => Ok(path.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".aws").join("credentials"))
                .ok_or_else(|| ConfigurationError::InvalidValue {
                    field: "credentials".into(),
                    reason: "no home directory; pass --credentials".into(),
                }),
        }
    }

    pub fn selection(&self) -> Result<ProfileSelection, ConfigurationError> {
        ProfileSelection::from_lists(self.include.clone(), self.exclude.clone())
    }

    pub fn rotation_options(&self) -> RotationOptions {
        RotationOptions::default()
            .with_call_timeout(Duration::from_secs(self.timeout_secs))
            .with_dry_run(self.dry_run)
    }

    pub fn iam_config(&self) -> IamAuthorityConfig {
        IamAuthorityConfig {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("keyrot").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            let dir = jail.directory().display().to_string();
            jail.set_env("XDG_CONFIG_HOME", dir);
            let settings = Settings::load(&cli(&[])).map_err(|e| e.to_string())?;
            assert_eq!(settings, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn test_layers_in_order() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "keyrot.toml",
                r#"
                    timeout_secs = 10
                    region = "eu-west-1"
                    exclude = ["sandbox"]
                    output = "json"
                "#,
            )?;
            jail.set_env("KEYROT_TIMEOUT_SECS", "20");
            jail.set_env("KEYROT_EXCLUDE", "sandbox, legacy");

            let settings = Settings::load(&cli(&[
                "--config",
                "keyrot.toml",
                "--region",
                "us-west-2",
                "--dry-run",
            ]))
            .map_err(|e| e.to_string())?;

            assert_eq!(settings.timeout_secs, 20);
            assert_eq!(settings.region.as_deref(), Some("us-west-2"));
            assert_eq!(settings.exclude, vec!["sandbox", "legacy"]);
            assert_eq!(settings.output, OutputFormat::Json);
            assert!(settings.dry_run);
            Ok(())
        });
    }

    #[test]
    fn test_timeout_out_of_range() {
        Jail::expect_with(|jail| {
            let dir = jail.directory().display().to_string();
            jail.set_env("XDG_CONFIG_HOME", dir);
            let err = Settings::load(&cli(&["--timeout-secs", "0"])).unwrap_err();
            assert!(err.to_string().contains("timeout_secs"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        Jail::expect_with(|_jail| {
            let err = Settings::load(&cli(&["--config", "absent.toml"])).unwrap_err();
            assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_include_from_file_and_exclude_from_flag_conflict() {
        Jail::expect_with(|jail| {
            jail.create_file("keyrot.toml", r#"include = ["prod"]"#)?;
            let settings = Settings::load(&cli(&["--config", "keyrot.toml", "--exclude", "dev"]))
                .map_err(|e| e.to_string())?;
            assert!(matches!(
                settings.selection(),
                Err(ConfigurationError::ConflictingSelection)
            ));
            Ok(())
        });
    }
}
