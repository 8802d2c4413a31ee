//! # Image Batch Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione della run, operazione scelta e validazione
//! - `error`: Tipi di errore per le operazioni sui singoli file
//! - `file_manager`: Filtro di eleggibilità e sostituzione atomica dei file
//! - `cancel`: Token di annullamento e listener Esc/Ctrl-C
//! - `walker`: Visita della directory sorgente (ricorsiva o no)
//! - `resize`: Calcolo delle dimensioni scalate e resize bilineare
//! - `image_processor`: Operazione su un singolo file
//! - `processor`: Pool di worker e coordinatore della run
//! - `progress`: Progress bar e statistiche
//! - `json_output`: Eventi JSON per uso programmatico
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use image_batch::{BatchProcessor, Config, Operation};
//!
//! let config = Config::new("/photos", Operation::Invert);
//! let report = BatchProcessor::new(config)?.run().await?;
//! println!("{}", report.status);
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod processor;
pub mod progress;
pub mod resize;
pub mod walker;

pub use cancel::{AbortListener, CancellationToken};
pub use config::{Config, Operation};
pub use error::ProcessError;
pub use image_processor::{ImageProcessor, Outcome};
pub use processor::{BatchProcessor, RunReport};
pub use progress::{RunStats, RunStatus};
pub use walker::{DirectoryWalker, WalkSummary};
