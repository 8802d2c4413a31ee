//! # Cancellation Module
//!
//! Segnale di annullamento condiviso da walker, dispatcher e worker.
//!
//! - `CancellationToken`: flag atomico, passa una sola volta da "attivo" ad "annullato"
//! - `AbortListener`: sorgenti esterne del segnale (tasto Esc su stdin, Ctrl-C)
//!
//! Il listener è fire-and-forget: nessuno lo attende e non impedisce
//! all'applicazione di terminare quando la run finisce normalmente.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Byte produced by the Escape key on a terminal
pub const ESC_BYTE: u8 = 0x1B;

/// One-way, process-wide stop signal.
///
/// Cloning is cheap and every clone observes the same flag. Once
/// [`signal`](Self::signal) has returned, [`is_cancelled`](Self::is_cancelled)
/// is true for every holder and never goes back to false.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the run as cancelled. Idempotent; returns true only for the call that flipped it.
    pub fn signal(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Background watchers that turn an interactive abort request into a token signal
pub struct AbortListener;

impl AbortListener {
    /// Start both abort triggers for `token`. Nothing is returned to join on.
    pub fn spawn(token: CancellationToken) {
        Self::spawn_escape_watcher(token.clone());
        Self::spawn_ctrl_c_watcher(token);
    }

    /// Watch stdin for the Esc key on a detached OS thread.
    ///
    /// A plain thread blocked on stdin does not keep the process alive once
    /// `main` returns, and it stays off the runtime's blocking pool.
    fn spawn_escape_watcher(token: CancellationToken) {
        let spawned = std::thread::Builder::new()
            .name("abort-listener".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                Self::watch_for_escape(stdin.lock(), &token);
            });

        if let Err(e) = spawned {
            warn!("Could not start Esc listener: {}", e);
        }
    }

    /// Spawn a detached task that cancels the run on Ctrl-C
    fn spawn_ctrl_c_watcher(token: CancellationToken) {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    if token.signal() {
                        info!("Operation cancelled by user (Ctrl-C)");
                    }
                }
                Err(e) => warn!("Could not listen for Ctrl-C: {}", e),
            }
        });
    }

    /// Read `input` until an Esc byte shows up (signal) or the stream ends (give up).
    pub fn watch_for_escape<R: Read>(input: R, token: &CancellationToken) -> bool {
        for byte in input.bytes() {
            match byte {
                Ok(ESC_BYTE) => {
                    if token.signal() {
                        info!("Operation cancelled by user (Esc)");
                    }
                    return true;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Error while watching for Esc: {}", e);
                    return false;
                }
            }
            if token.is_cancelled() {
                return false;
            }
        }
        debug!("Stdin closed, Esc listener stopped");
        false
    }
}
