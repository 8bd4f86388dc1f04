//! Session wiring: one reconciler per command invocation

use anyhow::{Context as AnyhowContext, Result};
use declarative::{Reconciler, ResourceRegistry};
use remotekit::{Client, RetryConfig};
use std::sync::Arc;

use crate::Context;
use crate::config::DriftwoodConfig;
use crate::resource;
use crate::state::JsonFileStore;

/// Everything a command needs to plan and apply
pub struct Session {
    pub config: DriftwoodConfig,
    pub reconciler: Reconciler,
    pub store: Arc<JsonFileStore>,
    backend: &'static str,
}

impl Session {
    /// Open a session that requires the configuration file to exist
    pub fn open(ctx: &Context) -> Result<Self> {
        Self::with_config(ctx, DriftwoodConfig::load(&ctx.config_path)?)
    }

    /// Open a session for commands that only touch state and the remote
    pub fn open_lenient(ctx: &Context) -> Result<Self> {
        Self::with_config(ctx, DriftwoodConfig::load_or_default(&ctx.config_path)?)
    }

    pub fn with_config(ctx: &Context, config: DriftwoodConfig) -> Result<Self> {
        let registry = Arc::new(resource::registry()?);
        let client = remote_client(ctx, &config)?;
        let backend = client.backend_name();

        let state_path = config.state.file_path()?;
        let store = Arc::new(
            JsonFileStore::open(&state_path)
                .with_context(|| format!("Failed to open state file: {}", state_path.display()))?,
        );

        let reconciler = Reconciler::new(registry, Arc::new(client), store.clone())
            .with_timeout(Some(config.remote.timeout()))
            .with_cancel(ctx.cancel.clone());

        log::debug!("Session ready: {backend} backend, state at {}", state_path.display());
        Ok(Self {
            config,
            reconciler,
            store,
            backend,
        })
    }

    pub fn registry(&self) -> &ResourceRegistry {
        self.reconciler.registry()
    }

    /// Name of the remote backend in use (`http` or `file`)
    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

/// Build the remote client; flags and environment override the file
fn remote_client(ctx: &Context, config: &DriftwoodConfig) -> Result<Client> {
    let remote = &config.remote;
    let retry = RetryConfig {
        max_attempts: remote.retries.max(1),
        ..RetryConfig::default()
    };

    let endpoint = ctx.endpoint.clone().or_else(|| remote.endpoint.clone());
    let client = match endpoint {
        Some(url) => {
            let token = ctx.token.clone().or_else(|| remote.token.clone());
            log::info!("Using remote endpoint {url}");
            Client::http(url, token, remote.timeout())
        }
        None => {
            let dir = remote.directory_path()?;
            log::info!("No endpoint configured, emulating remote in {}", dir.display());
            Client::file(&dir)
                .with_context(|| format!("Failed to open remote directory: {}", dir.display()))?
        }
    };

    Ok(client.with_retry(retry))
}
