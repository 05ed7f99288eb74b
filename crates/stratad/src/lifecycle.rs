//! Process lifecycle: consumes service signals and decides how the daemon
//! exits.

use std::future::Future;

use anyhow::Context;
use strata_control::ServiceSignal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Why the server stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Stop,
    Restart,
    /// Ctrl-C, or every signal sender went away.
    Interrupted,
}

/// Wait for the first `stop`/`restart` signal or for `interrupt` to fire.
pub async fn wait_for_exit(
    mut signals: mpsc::Receiver<ServiceSignal>,
    interrupt: impl Future<Output = ()>,
) -> Exit {
    let next_signal = async {
        loop {
            match signals.recv().await {
                Some(ServiceSignal::Stop) => return Exit::Stop,
                Some(ServiceSignal::Restart) => return Exit::Restart,
                Some(ServiceSignal::Status) => debug!("status signal needs no lifecycle action"),
                None => return Exit::Interrupted,
            }
        }
    };

    tokio::select! {
        exit = next_signal => {
            info!(?exit, "lifecycle signal received");
            exit
        }
        () = interrupt => {
            info!("shutdown signal received");
            Exit::Interrupted
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "unable to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Replace the current process with a fresh copy of itself, same arguments.
///
/// Only returns on failure.
#[cfg(unix)]
pub fn restart_process() -> anyhow::Result<()> {
    use std::os::unix::process::CommandExt;

    let exe = std::env::current_exe().context("locating current executable")?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    info!(exe = %exe.display(), ?args, "re-executing daemon");

    let err = std::process::Command::new(&exe).args(&args).exec();
    Err(err).with_context(|| format!("re-executing {}", exe.display()))
}

/// Spawn a fresh copy of the daemon with the same arguments and return,
/// letting the caller exit.
#[cfg(not(unix))]
pub fn restart_process() -> anyhow::Result<()> {
    let exe = std::env::current_exe().context("locating current executable")?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    info!(exe = %exe.display(), ?args, "spawning replacement daemon");

    std::process::Command::new(&exe)
        .args(&args)
        .spawn()
        .with_context(|| format!("spawning {}", exe.display()))?;
    Ok(())
}
