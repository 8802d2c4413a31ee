//! # Work Item Module
//!
//! Unità di lavoro per un singolo file: path + processore condiviso.
//! Separata dal coordinatore per tenere il confine degli errori in un solo punto:
//! qualsiasi errore del file viene registrato qui e non esce mai dal work item.

use crate::{
    cancel::CancellationToken,
    image_processor::ImageProcessor,
    processor::progress_tracker::ProgressTracker,
};
use std::path::PathBuf;
use std::sync::Arc;

/// One eligible file plus the operation to apply to it
#[derive(Debug, Clone)]
pub struct WorkItem {
    path: PathBuf,
    processor: Arc<ImageProcessor>,
}

impl WorkItem {
    pub fn new(path: PathBuf, processor: Arc<ImageProcessor>) -> Self {
        Self { path, processor }
    }

    /// Run the item on a worker. Never fails: the outcome is recorded on `tracker`
    /// and nothing is kept once it returns.
    pub async fn execute(self, token: CancellationToken, tracker: ProgressTracker) {
        let WorkItem { path, processor } = self;

        // Submitted before the abort but not started yet
        if token.is_cancelled() {
            tracker.record_skipped(&path);
            return;
        }

        let blocking_path = path.clone();
        let joined = tokio::task::spawn_blocking(move || processor.apply(&blocking_path)).await;

        match joined {
            Ok(Ok(outcome)) => tracker.record_success(&path, &outcome),
            Ok(Err(e)) => tracker.record_failure(&path, &e),
            Err(e) => tracker.record_failure(&path, &e),
        }
    }
}
