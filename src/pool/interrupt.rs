//! Interrupt handling for a run
//!
//! The first Ctrl-C cancels the run: no new suites start, running ones are
//! left alone. The SIGINT disposition that was in force before the runner
//! started listening is then put back, so a second Ctrl-C behaves as it
//! would without the runner (by default, it terminates it).

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

/// Captures the SIGINT disposition and restores it exactly once
pub struct InterruptGuard {
    #[cfg(unix)]
    previous: Option<libc::sigaction>,
    restored: AtomicBool,
}

impl InterruptGuard {
    /// Capture the current disposition; call before listening for Ctrl-C
    pub fn install() -> Self {
        Self {
            #[cfg(unix)]
            previous: current_disposition(),
            restored: AtomicBool::new(false),
        }
    }

    /// Resolves on the first Ctrl-C, after the disposition is restored
    ///
    /// Never resolves if the signal handler cannot be registered.
    pub async fn interrupted(&self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => self.restore(),
            Err(e) => {
                warn!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }

    /// Put the captured disposition back (idempotent)
    pub fn restore(&self) {
        if self.restored.swap(true, Ordering::SeqCst) {
            return;
        }

        #[cfg(unix)]
        if let Some(previous) = &self.previous {
            // SAFETY: `previous` was filled in by sigaction for this very signal.
            let rc = unsafe { libc::sigaction(libc::SIGINT, previous, std::ptr::null_mut()) };
            if rc != 0 {
                warn!(
                    "Could not restore SIGINT disposition: {}",
                    std::io::Error::last_os_error()
                );
            }
        }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(unix)]
fn current_disposition() -> Option<libc::sigaction> {
    // SAFETY: a zeroed sigaction is a valid out-parameter; a null new action
    // only queries the current one.
    unsafe {
        let mut current: libc::sigaction = std::mem::zeroed();
        if libc::sigaction(libc::SIGINT, std::ptr::null(), &mut current) == 0 {
            Some(current)
        } else {
            None
        }
    }
}
