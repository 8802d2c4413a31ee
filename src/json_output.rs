//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico.
//!
//! ## Responsabilità:
//! - Emette un oggetto JSON per riga su stdout per ogni evento rilevante
//! - Riutilizza `RunStats` e `RunStatus` del modulo progress
//! - Fornisce un'interfaccia stabile per chi lancia il tool da script
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio run (sorgente, operazione, worker)
//! - `file_complete`: Fine elaborazione di un file (esito o errore)
//! - `complete`: Fine run con stato e statistiche finali
//! - `error`: Errore fatale (configurazione non valida)

use crate::config::Config;
use crate::progress::{RunStats, RunStatus};
use serde::Serialize;
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Inizio della run
    Start {
        source_dir: PathBuf,
        recursive: bool,
        operation: String,
        workers: usize,
        dry_run: bool,
    },

    /// Fine elaborazione di un file specifico
    FileComplete {
        path: PathBuf,
        success: bool,
        outcome: Option<String>,
        error: Option<String>,
    },

    /// Run conclusa
    Complete {
        status: RunStatus,
        stats: RunStats,
        duration_seconds: f64,
    },

    /// Errore fatale
    Error {
        message: String,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Crea un messaggio di inizio
    pub fn start(config: &Config) -> Self {
        Self::Start {
            source_dir: config.source_dir.clone(),
            recursive: config.recursive,
            operation: config.operation.to_string(),
            workers: config.workers,
            dry_run: config.dry_run,
        }
    }

    /// File elaborato con successo
    pub fn file_done(path: PathBuf, outcome: String) -> Self {
        Self::FileComplete {
            path,
            success: true,
            outcome: Some(outcome),
            error: None,
        }
    }

    /// File fallito
    pub fn file_failed(path: PathBuf, error: String) -> Self {
        Self::FileComplete {
            path,
            success: false,
            outcome: None,
            error: Some(error),
        }
    }

    /// Crea un messaggio di completamento generale
    pub fn complete(status: RunStatus, stats: RunStats, duration_seconds: f64) -> Self {
        Self::Complete {
            status,
            stats,
            duration_seconds,
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String) -> Self {
        Self::Error { message }
    }
}
