//! Ctrl-C handling for commands that change remote objects
//!
//! The first interrupt cancels the shared token: objects already in flight
//! finish their current step and the rest are reported as cancelled. A
//! second interrupt exits immediately.

use anyhow::{Context, Result};
use declarative::CancelToken;
use std::future::Future;
use std::io;
use std::thread;

/// Exit status of a process stopped by SIGINT
const INTERRUPTED: i32 = 130;

/// Watch for Ctrl-C on a background thread
pub fn cancel_on_interrupt(token: CancelToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the interrupt handler")?;

    thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if !cancel_when(&token, tokio::signal::ctrl_c()).await {
                    return;
                }
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(INTERRUPTED);
                }
            });
        })
        .context("Failed to start the interrupt handler")?;
    Ok(())
}

/// Cancel `token` once `interrupted` resolves; false if listening failed
async fn cancel_when<F>(token: &CancelToken, interrupted: F) -> bool
where
    F: Future<Output = io::Result<()>>,
{
    match interrupted.await {
        Ok(()) => {
            crate::ui::warn("Interrupted: finishing in-flight steps, press Ctrl-C again to abort");
            token.cancel();
            true
        }
        Err(e) => {
            log::warn!("Cannot listen for Ctrl-C: {e}");
            false
        }
    }
}
