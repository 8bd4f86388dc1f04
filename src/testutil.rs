//! Shared fixtures for command and engine tests

use std::fs;

use tempfile::TempDir;

use crate::Context;
use crate::config::DriftwoodConfig;
use crate::engine::Session;

/// Context pointing at `driftwood.toml` inside `dir`
pub fn context(dir: &TempDir) -> Context {
    Context {
        verbose: 0,
        quiet: true,
        config_path: dir.path().join("driftwood.toml"),
        endpoint: None,
        token: None,
        cancel: declarative::CancelToken::new(),
    }
}

/// Configuration keeping the emulated remote and the state file in `dir`
pub fn file_config(dir: &TempDir) -> DriftwoodConfig {
    let mut config = DriftwoodConfig::default();
    config.remote.directory = Some(dir.path().join("remote").display().to_string());
    config.remote.retries = 1;
    config.state.path = Some(dir.path().join("state.json").display().to_string());
    config
}

/// Write a config file declaring `resources` (TOML) next to the file backend
pub fn write_config(dir: &TempDir, resources: &str) {
    let content = format!(
        "[remote]\ndirectory = {:?}\nretries = 1\n\n[state]\npath = {:?}\n\n{resources}",
        dir.path().join("remote").display().to_string(),
        dir.path().join("state.json").display().to_string(),
    );
    fs::write(dir.path().join("driftwood.toml"), content).unwrap();
}

/// Session over the file backend in `dir` using the written config
pub fn session(dir: &TempDir) -> Session {
    Session::open(&context(dir)).unwrap()
}

pub const ARCHIVE: &str = r#"
[resource.aws_cloudwatch_event_archive.orders]
name = "orders"
event_source_arn = "arn:aws:events:us-east-1:123456789012:event-bus/default"
retention_days = 7
"#;
