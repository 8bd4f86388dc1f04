//! Desired configuration file (`driftwood.toml`)
//!
//! ```toml
//! [remote]
//! endpoint = "https://manage.example.com"
//! timeout_secs = 60
//!
//! [state]
//! path = "~/.local/state/driftwood/state.json"
//!
//! [resource.aws_cloudwatch_event_archive.orders]
//! name = "orders"
//! event_source_arn = "arn:aws:events:us-east-1:123456789012:event-bus/default"
//! ```
//!
//! Without an `endpoint` the remote system is emulated in a local directory.

use anyhow::{Context, Result, bail};
use declarative::{Attributes, DesiredConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "driftwood.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriftwoodConfig {
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub state: StateConfig,

    /// Declared objects: resource type -> local name -> attributes
    #[serde(default)]
    pub resource: BTreeMap<String, BTreeMap<String, Attributes>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Base URL of the management API
    pub endpoint: Option<String>,

    /// Bearer token; prefer `DRIFTWOOD_TOKEN` over writing it here
    pub token: Option<String>,

    /// Directory of the emulated remote system when no endpoint is set
    pub directory: Option<String>,

    /// Bound on a single remote operation, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per remote call for throttling and outages
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_retries() -> u32 {
    4
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            directory: None,
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Directory for the emulated remote system
    pub fn directory_path(&self) -> Result<PathBuf> {
        match &self.directory {
            Some(dir) => Ok(paths::expand(dir)),
            None => paths::remote_dir(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    /// State file location
    pub path: Option<String>,
}

impl StateConfig {
    pub fn file_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(paths::expand(path)),
            None => paths::state_file(),
        }
    }
}

impl DriftwoodConfig {
    /// Load and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load a configuration file, falling back to defaults when it is absent
    ///
    /// Used by commands that only need the remote and state settings.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Declared objects in address order
    pub fn desired(&self) -> Result<Vec<DesiredConfig>> {
        let mut desired = Vec::new();
        for (resource_type, objects) in &self.resource {
            for (name, attributes) in objects {
                if name.is_empty() || name.contains('.') {
                    bail!("Invalid name '{name}' for {resource_type}: names must be non-empty and contain no '.'");
                }
                desired.push(DesiredConfig::new(
                    resource_type.as_str(),
                    name,
                    attributes.clone(),
                ));
            }
        }
        Ok(desired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Value;

    const SAMPLE: &str = r#"
[remote]
endpoint = "https://manage.example.com"
retries = 2

[state]
path = "/var/lib/driftwood/state.json"

[resource.aws_cloudwatch_event_archive.orders]
name = "orders"
event_source_arn = "arn:aws:events:us-east-1:123456789012:event-bus/default"
retention_days = 7

[resource.aws_securityhub_automation_rule.suppress_dev]
rule_name = "suppress-dev"
description = "Suppress findings from dev accounts"
rule_enabled = false

[[resource.aws_securityhub_automation_rule.suppress_dev.criteria]]
key = "AwsAccountId"
operator = "EQUALS"
values = ["123456789012"]

[[resource.aws_securityhub_automation_rule.suppress_dev.actions]]
workflow_status = "SUPPRESSED"
user_defined_fields = { team = "platform" }
"#;

    #[test]
    fn test_parse_sample() {
        let config = DriftwoodConfig::parse(SAMPLE).unwrap();

        assert_eq!(
            config.remote.endpoint.as_deref(),
            Some("https://manage.example.com")
        );
        assert_eq!(config.remote.retries, 2);
        assert_eq!(config.remote.timeout_secs, 300);
        assert_eq!(
            config.state.file_path().unwrap(),
            PathBuf::from("/var/lib/driftwood/state.json")
        );
    }

    #[test]
    fn test_desired_objects() {
        let config = DriftwoodConfig::parse(SAMPLE).unwrap();
        let desired = config.desired().unwrap();

        let addresses: Vec<_> = desired.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec![
                "aws_cloudwatch_event_archive.orders",
                "aws_securityhub_automation_rule.suppress_dev",
            ]
        );

        let archive = &desired[0];
        assert_eq!(archive.attributes["retention_days"], Value::Int(7));

        let rule = &desired[1];
        assert_eq!(rule.attributes["rule_enabled"], Value::Bool(false));
        let criteria = rule.attributes["criteria"].as_list().unwrap();
        let criterion = criteria[0].as_map().unwrap();
        assert_eq!(criterion["operator"], Value::from("EQUALS"));
        assert_eq!(criterion["values"], Value::from(vec!["123456789012"]));
    }

    #[test]
    fn test_empty_config() {
        let config = DriftwoodConfig::parse("").unwrap();
        assert!(config.remote.endpoint.is_none());
        assert!(config.desired().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        assert!(DriftwoodConfig::parse("[remotes]\nendpoint = \"x\"").is_err());
    }

    #[test]
    fn test_dotted_name_is_rejected() {
        let config = DriftwoodConfig::parse(
            "[resource.aws_cloudwatch_event_archive.\"a.b\"]\nname = \"a\"",
        )
        .unwrap();
        assert!(config.desired().is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = DriftwoodConfig::load_or_default(&dir.path().join("nope.toml")).unwrap();
        assert!(config.resource.is_empty());
        assert!(DriftwoodConfig::load(&dir.path().join("nope.toml")).is_err());
    }
}
