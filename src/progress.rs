//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce la progress bar e le statistiche aggregate di una run.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time
//! - La lunghezza della barra cresce man mano che il walker invia file
//! - Tracking statistiche (file inviati, completati, falliti, saltati)
//! - Report finale con stato della run (completata, annullata, timeout)
//!
//! ## Statistiche tracciate:
//! - **files_submitted**: Work item inviati al pool
//! - **files_succeeded**: Operazione completata
//! - **files_failed**: Errore confinato al singolo file
//! - **files_skipped**: Work item scartati dopo l'annullamento
//! - **files_aborted**: Work item interrotti allo scadere del timeout
//! - **total_bytes**: Byte scritti (o liberati, per delete)
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [========================>---------------] 96/150 (64%) [OK] photo.jpg: inverted
//! ```

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Manages progress reporting for a batch run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a progress bar whose length grows as files are submitted
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A progress manager that never draws (JSON mode)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden()),
        }
    }

    /// One more file is expected
    pub fn add_pending(&self) {
        self.bar.inc_length(1);
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every submitted work item finished
    Completed,
    /// An abort was requested; work already started was allowed to finish
    Cancelled,
    /// The pool did not drain in time and remaining work was aborted
    TimedOut,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::TimedOut => "timed out",
        };
        f.write_str(text)
    }
}

/// Statistics for one run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub files_submitted: usize,
    pub files_succeeded: usize,
    pub files_failed: usize,
    pub files_skipped: usize,
    pub files_aborted: usize,
    pub total_bytes: u64,
}

impl RunStats {
    pub fn format_summary(&self) -> String {
        format!(
            "Submitted: {} files | Succeeded: {} | Failed: {} | Skipped: {} | Aborted: {} | Bytes: {}",
            self.files_submitted,
            self.files_succeeded,
            self.files_failed,
            self.files_skipped,
            self.files_aborted,
            FileManager::format_size(self.total_bytes),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_tracks_length_and_position() {
        let progress = ProgressManager::hidden();
        progress.add_pending();
        progress.add_pending();
        progress.update("[OK] a.png");

        assert_eq!(progress.bar.length(), Some(2));
        assert_eq!(progress.bar.position(), 1);
    }

    #[test]
    fn test_summary_mentions_every_counter() {
        let stats = RunStats {
            files_submitted: 4,
            files_succeeded: 2,
            files_failed: 1,
            files_skipped: 1,
            files_aborted: 0,
            total_bytes: 2048,
        };

        let summary = stats.format_summary();
        assert!(summary.contains("Submitted: 4"));
        assert!(summary.contains("Failed: 1"));
        assert!(summary.contains("2.00 KB"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&RunStatus::TimedOut).unwrap(), r#""timed_out""#);
        assert_eq!(RunStatus::Cancelled.to_string(), "cancelled");
    }
}
