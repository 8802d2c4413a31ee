//! # Progress Tracking Module
//!
//! Tracker thread-safe condiviso da tutti i work item di una run.
//! Aggiorna i contatori, la progress bar e, in modalità JSON, emette un
//! evento `file_complete` per ogni file.

use crate::{
    image_processor::Outcome,
    json_output::JsonMessage,
    progress::{ProgressManager, RunStats},
};
use std::fmt::Display;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Contatori condivisi, clonabile a costo zero
#[derive(Clone)]
pub struct ProgressTracker {
    files_submitted: Arc<AtomicUsize>,
    files_succeeded: Arc<AtomicUsize>,
    files_failed: Arc<AtomicUsize>,
    files_skipped: Arc<AtomicUsize>,
    total_bytes: Arc<AtomicU64>,
    progress_manager: ProgressManager,
    json_output: bool,
}

impl ProgressTracker {
    /// Crea un nuovo tracker; la barra è nascosta in modalità JSON
    pub fn new(json_output: bool) -> Self {
        let progress_manager = if json_output {
            ProgressManager::hidden()
        } else {
            ProgressManager::new()
        };
        Self::with_manager(progress_manager, json_output)
    }

    pub fn with_manager(progress_manager: ProgressManager, json_output: bool) -> Self {
        Self {
            files_submitted: Arc::new(AtomicUsize::new(0)),
            files_succeeded: Arc::new(AtomicUsize::new(0)),
            files_failed: Arc::new(AtomicUsize::new(0)),
            files_skipped: Arc::new(AtomicUsize::new(0)),
            total_bytes: Arc::new(AtomicU64::new(0)),
            progress_manager,
            json_output,
        }
    }

    /// Un work item è stato inviato al pool
    pub fn record_submitted(&self) {
        self.files_submitted.fetch_add(1, Ordering::Relaxed);
        self.progress_manager.add_pending();
    }

    /// File completato
    pub fn record_success(&self, file_path: &Path, outcome: &Outcome) {
        self.files_succeeded.fetch_add(1, Ordering::Relaxed);
        self.total_bytes.fetch_add(outcome.bytes(), Ordering::Relaxed);
        debug!("{}: {}", file_path.display(), outcome);

        if self.json_output {
            JsonMessage::file_done(file_path.to_path_buf(), outcome.to_string()).emit();
        }

        let message = format!("[OK] {}: {}", file_name(file_path), outcome);
        self.progress_manager.update(&message);
    }

    /// File fallito: una riga di log per file, mai propagato
    pub fn record_failure(&self, file_path: &Path, error: &dyn Display) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
        error!("Failed to process {}: {}", file_path.display(), error);

        if self.json_output {
            JsonMessage::file_failed(file_path.to_path_buf(), error.to_string()).emit();
        }

        let message = format!("[ERROR] {}", file_name(file_path));
        self.progress_manager.update(&message);
    }

    /// Work item scartato dopo l'annullamento
    pub fn record_skipped(&self, file_path: &Path) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
        debug!("Skipping {} (run cancelled)", file_path.display());

        let message = format!("[SKIP] {}: cancelled", file_name(file_path));
        self.progress_manager.update(&message);
    }

    /// Finalizza progress bar
    pub fn finish(&self, summary: &str) {
        self.progress_manager.finish(summary);
    }

    /// Ottieni statistiche correnti
    pub fn snapshot(&self) -> RunStats {
        RunStats {
            files_submitted: self.files_submitted.load(Ordering::Relaxed),
            files_succeeded: self.files_succeeded.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            files_aborted: 0,
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap_or_default().to_string_lossy().to_string()
}
