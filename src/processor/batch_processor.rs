//! # Batch Processor Main Orchestrator
//!
//! Coordinatore della run: valida la configurazione, avvia il listener di
//! annullamento, collega il walker al pool di worker, attende lo svuotamento
//! (o il timeout) e produce il report finale.
//!
//! ## Flusso:
//! 1. `new`: valida la configurazione, poi crea la directory di copia se serve
//! 2. Listener Esc/Ctrl-C in background (mai atteso)
//! 3. Walker su un thread bloccante, i path eleggibili arrivano su un canale
//! 4. Ogni path diventa un work item inviato al pool, finché la run non è annullata
//! 5. Svuotamento del pool con timeout, stato finale e statistiche

use crate::{
    cancel::{AbortListener, CancellationToken},
    config::Config,
    image_processor::ImageProcessor,
    json_output::JsonMessage,
    processor::{progress_tracker::ProgressTracker, task::WorkItem, worker_pool::WorkerPool},
    progress::{RunStats, RunStatus},
    walker::{DirectoryWalker, WalkSummary},
};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Everything a finished run reports
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub stats: RunStats,
    pub walk: WalkSummary,
    pub duration: Duration,
}

/// Orchestratore principale
pub struct BatchProcessor {
    config: Config,
    token: CancellationToken,
    processor: Arc<ImageProcessor>,
}

impl BatchProcessor {
    /// Valida e prepara la configurazione; nessun file viene toccato se la validazione fallisce
    pub fn new(config: Config) -> Result<Self> {
        Self::with_token(config, CancellationToken::new())
    }

    /// Come `new`, ma con un token fornito dal chiamante
    pub fn with_token(config: Config, token: CancellationToken) -> Result<Self> {
        config.validate()?;
        config.prepare_target()?;

        let processor = Arc::new(ImageProcessor::new(config.operation.clone(), config.dry_run));

        Ok(Self {
            config,
            token,
            processor,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token da segnalare per annullare la run dall'esterno
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Esegue la run fino a svuotamento del pool o timeout
    pub async fn run(&self) -> Result<RunReport> {
        let start_time = Instant::now();

        self.emit_start_message();
        self.log_configuration();

        if self.config.listen_for_abort {
            AbortListener::spawn(self.token.clone());
            if !self.config.json_output {
                info!("Press Esc then Enter, or Ctrl-C, to cancel");
            }
        }

        let tracker = ProgressTracker::new(self.config.json_output);
        let mut pool = WorkerPool::new(self.config.workers);
        debug!("Worker pool started with {} workers", pool.size());

        let (sender, receiver) = mpsc::unbounded_channel::<PathBuf>();
        let walker = DirectoryWalker::new(&self.config.source_dir, self.config.recursive, self.token.clone())
            .follow_links(self.config.follow_links);
        let walk_task = tokio::task::spawn_blocking(move || {
            walker.walk(|path| {
                // A closed receiver means dispatch stopped; the walker sees the token next
                let _ = sender.send(path);
            })
        });

        self.dispatch(receiver, &mut pool, &tracker).await;

        let walk = walk_task.await?;
        debug!("Walk finished: {:?}, {} work items pending", walk, pool.pending());

        let drain = pool.shutdown(self.config.drain_timeout()).await;
        debug!("Pool drained: {:?}", drain);

        let status = if drain.timed_out {
            RunStatus::TimedOut
        } else if self.token.is_cancelled() {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };

        let mut stats = tracker.snapshot();
        stats.files_failed += drain.panicked;
        stats.files_aborted = drain.aborted;

        let duration = start_time.elapsed();
        tracker.finish(&stats.format_summary());
        self.print_final_stats(status, &stats, &walk, duration);

        Ok(RunReport {
            status,
            stats,
            walk,
            duration,
        })
    }

    /// Turn every walked path into a work item until the channel closes or the run is cancelled.
    ///
    /// Dropping the receiver on cancellation lets the walker's sends fail fast.
    async fn dispatch(
        &self,
        mut receiver: mpsc::UnboundedReceiver<PathBuf>,
        pool: &mut WorkerPool,
        tracker: &ProgressTracker,
    ) {
        while let Some(path) = receiver.recv().await {
            if self.token.is_cancelled() {
                debug!("Cancellation observed, no further work items will be submitted");
                break;
            }
            tracker.record_submitted();
            let item = WorkItem::new(path, Arc::clone(&self.processor));
            pool.submit(item.execute(self.token.clone(), tracker.clone()));
        }
    }

    /// Invia messaggio di inizio
    fn emit_start_message(&self) {
        if self.config.json_output {
            JsonMessage::start(&self.config).emit();
        } else {
            info!("Starting batch run in: {}", self.config.source_dir.display());
        }
    }

    /// Logga configurazione (solo se non JSON mode)
    fn log_configuration(&self) {
        if self.config.json_output {
            return;
        }

        info!("Operation: {}", self.config.operation);
        info!(
            "Traversal: {}",
            if self.config.recursive { "recursive" } else { "top level only" }
        );
        info!("Workers: {}", self.config.workers);

        if self.config.dry_run {
            info!("Dry run mode: No files will be modified");
        }
        if !self.config.follow_links {
            info!("Symbolic links are not followed");
        }
    }

    /// Stampa statistiche finali
    fn print_final_stats(&self, status: RunStatus, stats: &RunStats, walk: &WalkSummary, duration: Duration) {
        if self.config.json_output {
            JsonMessage::complete(status, stats.clone(), duration.as_secs_f64()).emit();
            return;
        }

        info!("=== Batch Run {} ===", status);
        info!("Files submitted: {}", stats.files_submitted);
        info!("Files succeeded: {}", stats.files_succeeded);
        info!("Files failed: {}", stats.files_failed);
        if stats.files_skipped > 0 {
            info!("Files skipped after cancellation: {}", stats.files_skipped);
        }
        if walk.unreadable > 0 {
            warn!("Unreadable entries skipped: {}", walk.unreadable);
        }
        match status {
            RunStatus::TimedOut => warn!(
                "Timed out after {:?}, {} work items aborted",
                self.config.drain_timeout(),
                stats.files_aborted
            ),
            RunStatus::Cancelled => warn!("Operation cancelled by user"),
            RunStatus::Completed => {}
        }
        info!("Duration: {:.2}s", duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Operation;
    use crate::progress::ProgressManager;
    use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// a.png (3x2), b.txt, sub/c.jpg
    fn scenario_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("sub")).unwrap();
        RgbaImage::from_fn(3, 2, |x, y| Rgba([(x * 60) as u8, (y * 100) as u8, 30, 255]))
            .save(root.join("a.png"))
            .unwrap();
        fs::write(root.join("b.txt"), b"leave me alone").unwrap();
        RgbImage::from_pixel(4, 4, Rgb([200, 200, 200]))
            .save(root.join("sub").join("c.jpg"))
            .unwrap();
        temp_dir
    }

    fn config_for(root: &Path, operation: Operation) -> Config {
        let mut config = Config::new(root, operation);
        config.listen_for_abort = false;
        config.json_output = true;
        config.workers = 2;
        config
    }

    fn snapshot(root: &Path) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        (
            fs::read(root.join("a.png")).unwrap(),
            fs::read(root.join("b.txt")).unwrap(),
            fs::read(root.join("sub").join("c.jpg")).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_invert_non_recursive_touches_only_top_level() {
        let tree = scenario_tree();
        let (a_before, b_before, c_before) = snapshot(tree.path());

        let processor = BatchProcessor::new(config_for(tree.path(), Operation::Invert)).unwrap();
        let report = tokio_test::assert_ok!(processor.run().await);

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.stats.files_submitted, 1);
        assert_eq!(report.stats.files_succeeded, 1);

        let (a_after, b_after, c_after) = snapshot(tree.path());
        assert_ne!(a_after, a_before);
        assert_eq!(b_after, b_before);
        assert_eq!(c_after, c_before);

        let pixel = image::open(tree.path().join("a.png")).unwrap().to_rgba8();
        assert_eq!(*pixel.get_pixel(1, 1), Rgba([255 - 60, 255 - 100, 255 - 30, 255]));
    }

    #[tokio::test]
    async fn test_invert_recursive_touches_nested_files() {
        let tree = scenario_tree();
        let (a_before, b_before, c_before) = snapshot(tree.path());

        let mut config = config_for(tree.path(), Operation::Invert);
        config.recursive = true;
        let report = BatchProcessor::new(config).unwrap().run().await.unwrap();

        assert_eq!(report.stats.files_submitted, 2);
        assert_eq!(report.stats.files_succeeded, 2);
        assert_eq!(report.walk.eligible, 2);

        let (a_after, b_after, c_after) = snapshot(tree.path());
        assert_ne!(a_after, a_before);
        assert_eq!(b_after, b_before);
        assert_ne!(c_after, c_before);

        let c = image::open(tree.path().join("sub").join("c.jpg")).unwrap().to_rgb8();
        // JPEG is lossy; 200 inverted is 55
        assert!(c.get_pixel(0, 0)[0] < 80);
    }

    #[tokio::test]
    async fn test_resize_identity_keeps_dimensions() {
        let tree = scenario_tree();
        let mut config = config_for(tree.path(), Operation::Resize { factor: 1.0 });
        config.recursive = true;

        BatchProcessor::new(config).unwrap().run().await.unwrap();

        assert_eq!(image::open(tree.path().join("a.png")).unwrap().dimensions(), (3, 2));
        assert_eq!(
            image::open(tree.path().join("sub").join("c.jpg")).unwrap().dimensions(),
            (4, 4)
        );
    }

    #[tokio::test]
    async fn test_resize_rounds_odd_dimensions() {
        let tree = scenario_tree();
        let config = config_for(tree.path(), Operation::Resize { factor: 1.5 });

        BatchProcessor::new(config).unwrap().run().await.unwrap();

        assert_eq!(image::open(tree.path().join("a.png")).unwrap().dimensions(), (5, 3));
    }

    #[tokio::test]
    async fn test_delete_removes_only_eligible_files() {
        let tree = scenario_tree();
        fs::write(tree.path().join("sub").join("readme.md"), b"docs").unwrap();
        let mut config = config_for(tree.path(), Operation::Delete);
        config.recursive = true;

        let report = BatchProcessor::new(config).unwrap().run().await.unwrap();

        assert_eq!(report.stats.files_succeeded, 2);
        assert!(!tree.path().join("a.png").exists());
        assert!(!tree.path().join("sub").join("c.jpg").exists());
        assert!(tree.path().join("b.txt").exists());
        assert!(tree.path().join("sub").join("readme.md").exists());
    }

    #[tokio::test]
    async fn test_copy_produces_identical_files() {
        let tree = scenario_tree();
        let target = TempDir::new().unwrap();
        let target_dir = target.path().join("copies");
        let (a_before, _, c_before) = snapshot(tree.path());

        let mut config = config_for(tree.path(), Operation::CopyTo { target_dir: target_dir.clone() });
        config.recursive = true;
        let report = BatchProcessor::new(config).unwrap().run().await.unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(fs::read(target_dir.join("a.png")).unwrap(), a_before);
        assert_eq!(fs::read(target_dir.join("c.jpg")).unwrap(), c_before);
        assert!(!target_dir.join("b.txt").exists());

        let (a_after, _, c_after) = snapshot(tree.path());
        assert_eq!(a_after, a_before);
        assert_eq!(c_after, c_before);
    }

    #[tokio::test]
    async fn test_submissions_match_eligible_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("x").join("y")).unwrap();
        let names = ["1.JPG", "2.jpeg", "3.Png", "4.bmp", "x/5.png", "x/y/6.jpg", "x/7.gif", "x/y/8"];
        for name in names {
            fs::write(root.join(name), b"not really an image").unwrap();
        }

        let mut config = config_for(root, Operation::Invert);
        config.recursive = true;
        config.dry_run = true;
        let report = BatchProcessor::new(config).unwrap().run().await.unwrap();

        assert_eq!(report.stats.files_submitted, 6);
        assert_eq!(report.walk.eligible, 6);
        // Garbage content: every decode fails, and each failure stays local
        assert_eq!(report.stats.files_failed, 6);
        assert_eq!(report.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_corrupt_file_does_not_stop_siblings() {
        let tree = scenario_tree();
        fs::write(tree.path().join("broken.png"), b"garbage").unwrap();
        let mut config = config_for(tree.path(), Operation::Invert);
        config.recursive = true;

        let report = BatchProcessor::new(config).unwrap().run().await.unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.stats.files_submitted, 3);
        assert_eq!(report.stats.files_succeeded, 2);
        assert_eq!(report.stats.files_failed, 1);
        assert_eq!(fs::read(tree.path().join("broken.png")).unwrap(), b"garbage");
    }

    #[tokio::test]
    async fn test_cancelled_run_submits_nothing() {
        let tree = scenario_tree();
        let (a_before, b_before, c_before) = snapshot(tree.path());
        let token = CancellationToken::new();
        token.signal();

        let mut config = config_for(tree.path(), Operation::Delete);
        config.recursive = true;
        let processor = BatchProcessor::with_token(config, token).unwrap();
        let report = processor.run().await.unwrap();

        assert_eq!(report.status, RunStatus::Cancelled);
        assert_eq!(report.stats.files_submitted, 0);
        assert!(report.walk.cancelled);
        assert_eq!(snapshot(tree.path()), (a_before, b_before, c_before));
        assert!(processor.cancellation_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_invalid_configuration_touches_nothing() {
        let tree = scenario_tree();
        let before = snapshot(tree.path());

        let config = config_for(tree.path(), Operation::Resize { factor: -2.0 });
        assert!(BatchProcessor::new(config).is_err());

        let config = config_for(&tree.path().join("missing"), Operation::Delete);
        assert!(BatchProcessor::new(config).is_err());

        let target_dir = tree.path().join("copies");
        let config = config_for(&tree.path().join("missing"), Operation::CopyTo { target_dir: target_dir.clone() });
        assert!(BatchProcessor::new(config).is_err());
        assert!(!target_dir.exists());

        assert_eq!(snapshot(tree.path()), before);
    }

    #[tokio::test]
    async fn test_copy_target_is_created() {
        let tree = scenario_tree();
        let target_dir = tree.path().join("out").join("copies");

        let config = config_for(tree.path(), Operation::CopyTo { target_dir: target_dir.clone() });
        let report = BatchProcessor::new(config).unwrap().run().await.unwrap();

        assert!(target_dir.is_dir());
        assert_eq!(report.stats.files_succeeded, 1);
        assert!(target_dir.join("a.png").exists());
    }

    #[tokio::test]
    async fn test_huge_resize_fails_one_file_only() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        RgbImage::new(400, 300).save(root.join("a.png")).unwrap();
        RgbImage::new(3, 2).save(root.join("b.png")).unwrap();

        let config = config_for(root, Operation::Resize { factor: 100.0 });
        let report = BatchProcessor::new(config).unwrap().run().await.unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.stats.files_failed, 1);
        assert_eq!(report.stats.files_succeeded, 1);
        assert_eq!(image::open(root.join("a.png")).unwrap().dimensions(), (400, 300));
        assert_eq!(image::open(root.join("b.png")).unwrap().dimensions(), (300, 200));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_image_is_processed() {
        let tree = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let real = outside.path().join("real.png");
        RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])).save(&real).unwrap();
        std::os::unix::fs::symlink(&real, tree.path().join("link.png")).unwrap();

        let config = config_for(tree.path(), Operation::Invert);
        let report = BatchProcessor::new(config).unwrap().run().await.unwrap();

        assert_eq!(report.stats.files_submitted, 1);
        assert_eq!(report.stats.files_succeeded, 1);
        let pixel = *image::open(&real).unwrap().to_rgb8().get_pixel(0, 0);
        assert_eq!(pixel, Rgb([255, 255, 255]));
        assert!(fs::symlink_metadata(tree.path().join("link.png")).unwrap().file_type().is_symlink());
    }

    #[tokio::test]
    async fn test_slow_run_times_out_and_aborts_pending_work() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let first = root.join("img_00.png");
        RgbImage::from_fn(1024, 1024, |x, y| Rgb([(x ^ y) as u8, (x * 7) as u8, (y * 13) as u8]))
            .save(&first)
            .unwrap();
        for i in 1..40 {
            fs::copy(&first, root.join(format!("img_{:02}.png", i))).unwrap();
        }

        let mut config = config_for(root, Operation::Invert);
        config.workers = 1;
        config.drain_timeout_secs = 1;
        let report = BatchProcessor::new(config).unwrap().run().await.unwrap();

        assert_eq!(report.status, RunStatus::TimedOut);
        assert_eq!(report.stats.files_submitted, 40);
        assert!(report.stats.files_aborted > 0);
        assert!(report.stats.files_succeeded < 40);
    }

    #[tokio::test]
    async fn test_cancel_during_dispatch_stops_new_submissions() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let paths: Vec<PathBuf> = (0..5)
            .map(|i| {
                let path = root.join(format!("{}.png", i));
                RgbImage::from_pixel(2, 2, Rgb([9, 9, 9])).save(&path).unwrap();
                path
            })
            .collect();

        let processor = BatchProcessor::new(config_for(root, Operation::Delete)).unwrap();
        let token = processor.cancellation_token();
        let tracker = ProgressTracker::with_manager(ProgressManager::hidden(), false);
        let mut pool = WorkerPool::new(1);
        let (sender, receiver) = mpsc::unbounded_channel();

        let walk_side = async {
            for path in &paths[..3] {
                sender.send(path.clone()).unwrap();
            }
            while tracker.snapshot().files_submitted < 3 {
                tokio::task::yield_now().await;
            }
            token.signal();
            for path in &paths[3..] {
                sender.send(path.clone()).unwrap();
            }
            drop(sender);
        };
        tokio::join!(processor.dispatch(receiver, &mut pool, &tracker), walk_side);
        let drain = pool.shutdown(Duration::from_secs(5)).await;

        let stats = tracker.snapshot();
        assert_eq!(stats.files_submitted, 3);
        assert_eq!(stats.files_succeeded + stats.files_skipped, 3);
        assert_eq!(drain.finished, 3);
        assert!(paths[3].exists());
        assert!(paths[4].exists());
        let deleted = paths[..3].iter().filter(|p| !p.exists()).count();
        assert_eq!(deleted, stats.files_succeeded);
    }
}
