//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `ProcessError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//! - Mantiene il path del file coinvolto negli errori di codec
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (permessi, disco pieno, file spariti, etc.)
//! - `Decode`: Immagine corrotta o non leggibile (nessuna modifica al file)
//! - `Encode`: Errore durante la ri-codifica nel formato originale
//! - `InvalidDimensions`: Il fattore di scala produce dimensioni non valide
//! - `UnsupportedFormat`: Estensione non riconosciuta dal codec
//! - `SameFile`: Copia di un file su se stesso
//! - `Validation`: Errori di validazione della configurazione (fatali)
//!
//! ## Propagazione:
//! Solo `Validation` interrompe la run prima dell'inizio. Tutti gli altri errori
//! restano confinati al singolo work item: vengono loggati e contati, mai propagati.
//!
//! ## Esempio:
//! ```rust,ignore
//! if factor <= 0.0 {
//!     return Err(ProcessError::Validation("scale factor must be positive".to_string()));
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for batch image processing
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot decode image {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Cannot encode image {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Scale factor {factor} turns {width}x{height} into an empty or oversized image")]
    InvalidDimensions { width: u32, height: u32, factor: f64 },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Source and destination are the same file: {}", .0.display())]
    SameFile(PathBuf),

    #[error("Configuration error: {0}")]
    Validation(String),
}
