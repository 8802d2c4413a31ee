//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione di una run.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con la directory sorgente, la ricorsione e l'operazione
//! - Definisce l'enum `Operation`: esattamente una operazione attiva per run
//! - Fornisce validazione dei parametri prima che venga schedulato qualsiasi work item
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!
//! ## Parametri di configurazione:
//! - `source_dir`: Directory da elaborare (deve esistere ed essere una directory)
//! - `recursive`: Scende nelle sottodirectory (default: false)
//! - `operation`: Una tra `resize`, `invert`, `delete`, `copy_to`
//! - `workers`: Numero di worker paralleli (default: core disponibili)
//! - `drain_timeout_secs`: Attesa massima per lo svuotamento del pool (default: 3600)
//! - `follow_links`: Segue i symlink durante la visita (default: true)
//! - `dry_run`: Simulazione senza modifiche (default: false)
//! - `json_output`: Eventi JSON su stdout (default: false)
//! - `listen_for_abort`: Avvia il listener Esc/Ctrl-C (default: true)
//!
//! ## Validazione:
//! - Il fattore di scala deve essere finito e > 0
//! - `workers` e `drain_timeout_secs` devono essere > 0
//! - La directory sorgente deve esistere
//! - La directory di copia deve essere una directory (viene creata se manca)
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut config = Config::new("/photos", Operation::Resize { factor: 0.5 });
//! config.recursive = true;
//! config.validate()?;
//! config.prepare_target()?;
//! ```

use crate::error::ProcessError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default upper bound on how long the pool may take to drain
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 60 * 60;

/// The single transform applied to every eligible file of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Scale both dimensions by `factor` with bilinear interpolation
    Resize { factor: f64 },
    /// Replace every color channel `c` with `255 - c`, alpha untouched
    Invert,
    /// Remove the file
    Delete,
    /// Copy the file into `target_dir` under the same base name
    CopyTo { target_dir: PathBuf },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Resize { factor } => write!(f, "resize x{}", factor),
            Operation::Invert => write!(f, "invert"),
            Operation::Delete => write!(f, "delete"),
            Operation::CopyTo { target_dir } => write!(f, "copy to {}", target_dir.display()),
        }
    }
}

/// Configuration for one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the tree to process
    pub source_dir: PathBuf,
    /// Descend into subdirectories
    #[serde(default)]
    pub recursive: bool,
    /// The one operation of this run
    pub operation: Operation,
    /// Number of parallel workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// How long to wait for submitted work before aborting it
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
    /// Follow symbolic links while walking
    #[serde(default = "default_follow_links")]
    pub follow_links: bool,
    /// Dry run - log what would happen without touching files
    #[serde(default)]
    pub dry_run: bool,
    /// Output progress and status as JSON for programmatic use
    #[serde(default)]
    pub json_output: bool,
    /// Watch stdin (Esc) and Ctrl-C for an abort request
    #[serde(default = "default_listen_for_abort")]
    pub listen_for_abort: bool,
}

fn default_workers() -> usize {
    num_cpus::get().max(1)
}

fn default_drain_timeout_secs() -> u64 {
    DEFAULT_DRAIN_TIMEOUT_SECS
}

fn default_follow_links() -> bool {
    true
}

fn default_listen_for_abort() -> bool {
    true
}

impl Config {
    /// Create a configuration with default tuning for `source_dir` and `operation`
    pub fn new(source_dir: impl Into<PathBuf>, operation: Operation) -> Self {
        Self {
            source_dir: source_dir.into(),
            recursive: false,
            operation,
            workers: default_workers(),
            drain_timeout_secs: DEFAULT_DRAIN_TIMEOUT_SECS,
            follow_links: true,
            dry_run: false,
            json_output: false,
            listen_for_abort: true,
        }
    }

    /// Drain timeout as a `Duration`
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if let Operation::Resize { factor } = self.operation {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(invalid(format!("Scale factor must be a positive number, got {}", factor)));
            }
        }

        if self.workers == 0 {
            return Err(invalid("Number of workers must be greater than 0"));
        }

        if self.drain_timeout_secs == 0 {
            return Err(invalid("Drain timeout must be greater than 0 seconds"));
        }

        if !self.source_dir.exists() {
            return Err(invalid(format!("Source directory does not exist: {}", self.source_dir.display())));
        }
        if !self.source_dir.is_dir() {
            return Err(invalid(format!("Source path is not a directory: {}", self.source_dir.display())));
        }

        if let Operation::CopyTo { ref target_dir } = self.operation {
            // A missing target is created by `prepare_target`
            if target_dir.exists() && !target_dir.is_dir() {
                return Err(invalid(format!("Target path is not a directory: {}", target_dir.display())));
            }
        }

        Ok(())
    }

    /// Create the copy target directory if it is missing. Call after `validate`.
    pub fn prepare_target(&self) -> Result<()> {
        if let Operation::CopyTo { ref target_dir } = self.operation {
            if !target_dir.exists() {
                std::fs::create_dir_all(target_dir).map_err(|e| {
                    invalid(format!("Cannot create target directory {}: {}", target_dir.display(), e))
                })?;
                tracing::info!("Created target directory: {}", target_dir.display());
            }
        }
        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> anyhow::Error {
    ProcessError::Validation(message.into()).into()
}
