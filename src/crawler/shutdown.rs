//! Shutdown signal handling
//!
//! Interrupt, terminate and hangup all raise the same flag. The coordinator
//! checks it between batches, so the batch in flight is always finished and
//! persisted before the run stops.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Spawns listeners that set `flag` on the first shutdown signal
///
/// Unix signal handlers are registered before this returns, so a signal
/// delivered afterwards is never missed. Must be called inside a tokio
/// runtime.
///
/// # Errors
///
/// Fails when a signal handler cannot be registered.
pub fn listen_for_shutdown(flag: Arc<AtomicBool>) -> io::Result<()> {
    {
        let flag = Arc::clone(&flag);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                raise(&flag, "Interrupt");
            }
        });
    }

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        let mut hangup = signal(SignalKind::hangup())?;
        tokio::spawn(async move {
            let name = tokio::select! {
                _ = terminate.recv() => "Terminate",
                _ = hangup.recv() => "Hangup",
            };
            raise(&flag, name);
        });
    }

    Ok(())
}

fn raise(flag: &AtomicBool, name: &str) {
    tracing::warn!("{} received, finishing the current batch", name);
    flag.store(true, Ordering::SeqCst);
}
