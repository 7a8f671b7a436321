// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

/// Resolve when the process receives a shutdown signal (Unix).
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
    let mut sigint =
        signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            println!("\n[SIGNAL] SIGTERM received, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            println!("\n[SIGNAL] SIGINT received, initiating graceful shutdown");
        }
    }
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        println!("\n[SIGNAL] Ctrl+C received, initiating graceful shutdown");
    }
}
