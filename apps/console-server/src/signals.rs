use anyhow::Result;
use tokio::signal;

/// Wait for Ctrl+C or SIGTERM.
///
/// # Errors
/// Returns an error if a signal handler cannot be installed.
pub async fn wait_for_shutdown() -> Result<()> {
    tokio::select! {
        result = signal::ctrl_c() => result?,
        result = wait_sigterm() => result?,
    }
    tracing::info!("shutdown signal received");
    Ok(())
}

#[cfg(unix)]
async fn wait_sigterm() -> std::io::Result<()> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_sigterm() -> std::io::Result<()> {
    std::future::pending().await
}
