//! Rule reload task.
//!
//! Receives validated configs from the watcher, recompiles the rule set and
//! publishes it. A config that fails to compile leaves the current table in
//! place.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::MockConfig;
use crate::http::server::RuleSet;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;

/// Run until `shutdown` fires or the update channel closes.
///
/// `running` is the config the server started with; settings outside the
/// rule set are compared against it and only reported.
pub fn spawn_reload_task(
    mut updates: mpsc::UnboundedReceiver<MockConfig>,
    rules: RuleSet,
    running: MockConfig,
    shutdown: &Shutdown,
) -> JoinHandle<()> {
    let stopped = shutdown.notified();

    tokio::spawn(async move {
        tokio::pin!(stopped);
        loop {
            tokio::select! {
                _ = &mut stopped => break,
                update = updates.recv() => {
                    let Some(config) = update else { break };
                    apply(&rules, &running, &config);
                }
            }
        }
        tracing::debug!("Reload task stopped");
    })
}

fn apply(rules: &RuleSet, running: &MockConfig, config: &MockConfig) {
    if running.needs_restart(config) {
        tracing::warn!("Server, directory or observability settings changed; restart to apply them");
    }

    match rules.apply(config) {
        Ok(version) => {
            metrics::record_reload(true);
            tracing::info!(version, "Rules reloaded");
        }
        Err(e) => {
            metrics::record_reload(false);
            tracing::error!(error = %e, "Reloaded rules failed to compile, keeping current table");
        }
    }
}
