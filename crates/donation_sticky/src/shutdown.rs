use engine_logging::{engine_error, engine_info};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Trips `shutdown` on ctrl-c, or on SIGTERM where the platform has it.
///
/// If the signal handlers cannot be installed the token is cancelled at
/// once: a service that cannot be stopped cleanly should not start polling.
pub async fn cancel_on_signal(shutdown: CancellationToken) {
    match wait_for_signal().await {
        Ok(name) => engine_info!("Received {}, shutting down", name),
        Err(err) => engine_error!("Could not listen for shutdown signals: {}", err),
    }
    shutdown.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{self, SignalKind};

    let mut sigterm = unix::signal(SignalKind::terminate())?;
    tokio::select! {
        result = signal::ctrl_c() => result.map(|()| "ctrl-c"),
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    signal::ctrl_c().await.map(|()| "ctrl-c")
}
