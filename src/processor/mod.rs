//! # Processor Module
//!
//! Parte concorrente della run, separata in sottomoduli:
//! - `batch_processor`: Coordinatore della run
//! - `worker_pool`: Pool a concorrenza limitata con svuotamento a timeout
//! - `task`: Work item per un singolo file
//! - `progress_tracker`: Contatori condivisi ed eventi per file

pub mod batch_processor;
pub mod progress_tracker;
pub mod task;
pub mod worker_pool;

pub use batch_processor::{BatchProcessor, RunReport};
pub use progress_tracker::ProgressTracker;
pub use task::WorkItem;
pub use worker_pool::{DrainReport, WorkerPool};
