//! # Worker Pool Module
//!
//! Esecutore a concorrenza limitata: un `JoinSet` di task tokio e un semaforo
//! con tanti permessi quanti sono i worker.
//!
//! - `submit` non blocca mai: il task viene creato subito e attende il permesso
//! - I task terminati vengono raccolti a ogni `submit`: la memoria resta
//!   proporzionale al lavoro ancora in sospeso, non al totale dei file
//! - Nessun valore di ritorno viene conservato, solo i conteggi
//! - `shutdown` consuma il pool (nessun nuovo invio possibile), attende lo
//!   svuotamento fino al timeout e poi abortisce quello che resta

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, warn};

/// How the work submitted to a pool ended
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainReport {
    /// Work that ran to completion
    pub finished: usize,
    /// Work that panicked
    pub panicked: usize,
    /// Work still pending or running when the timeout hit
    pub aborted: usize,
    pub timed_out: bool,
}

impl DrainReport {
    fn record(&mut self, joined: Result<(), JoinError>) {
        match joined {
            Ok(()) => self.finished += 1,
            Err(e) if e.is_panic() => {
                error!("Work item panicked: {}", e);
                self.panicked += 1;
            }
            Err(e) => {
                debug!("Work item was cancelled: {}", e);
                self.aborted += 1;
            }
        }
    }
}

/// Fixed-size pool running submitted futures concurrently
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    tasks: JoinSet<()>,
    report: DrainReport,
    size: usize,
}

impl WorkerPool {
    /// Create a pool running at most `size` work items at once
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size.max(1))),
            tasks: JoinSet::new(),
            report: DrainReport::default(),
            size: size.max(1),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Work submitted and not yet reaped
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Enqueue `work`; returns immediately. Must be called within a tokio runtime.
    pub fn submit<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.reap_finished();

        let permits = Arc::clone(&self.permits);
        self.tasks.spawn(async move {
            // The semaphore is never closed, so this only fails if that changes
            let _permit = permits.acquire_owned().await.ok();
            work.await
        });
    }

    /// Count and drop every task that already ended
    fn reap_finished(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            self.report.record(joined);
        }
    }

    /// Stop accepting work, wait up to `timeout` for everything submitted, abort the rest.
    pub async fn shutdown(mut self, timeout: Duration) -> DrainReport {
        let tasks = &mut self.tasks;
        let report = &mut self.report;

        let drain = async {
            while let Some(joined) = tasks.join_next().await {
                report.record(joined);
            }
        };
        let timed_out = tokio::time::timeout(timeout, drain).await.is_err();

        if timed_out {
            let remaining = self.tasks.len();
            warn!("Pool did not drain within {:?}, aborting {} work items", timeout, remaining);
            self.report.timed_out = true;
            self.report.aborted += remaining;
            self.tasks.shutdown().await;
        }

        self.report
    }
}
