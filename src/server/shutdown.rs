//! Shutdown coordination for the accept loop.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// A cloneable stop flag.
///
/// The accept loop checks it between accepts; in-flight workers finish the
/// request they are serving.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the server to stop accepting connections.
    pub fn trigger(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            info!("shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sets the flag on SIGINT or SIGTERM.
    ///
    /// A second signal after the flag is set terminates the process at once.
    ///
    /// # Errors
    ///
    /// Returns the error from registering a signal handler.
    #[cfg(unix)]
    pub fn install_signal_handlers(&self) -> io::Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};

        for signal in [SIGINT, SIGTERM] {
            // Registered first so it sees the flag as it was before this signal.
            signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(&self.flag))?;
            signal_hook::flag::register(signal, Arc::clone(&self.flag))?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn install_signal_handlers(&self) -> io::Result<()> {
        tracing::warn!("signal handling is unavailable on this platform; use Shutdown::trigger");
        Ok(())
    }
}
