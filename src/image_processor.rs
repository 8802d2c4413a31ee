//! # Image Processing Module
//!
//! Questo modulo applica l'operazione della run a un singolo file.
//!
//! ## Operazioni
//!
//! | Operazione | Effetto                                                   |
//! |------------|-----------------------------------------------------------|
//! | Resize     | decode, resize bilineare, encode nel formato originale     |
//! | Invert     | decode, `255 - c` su R/G/B (alpha invariato), encode       |
//! | Delete     | rimozione del file                                         |
//! | CopyTo     | copia in `target_dir/<basename>`, sovrascrive se esiste    |
//!
//! ## Pipeline Resize/Invert
//!
//! 1. **Formato di output**: dall'estensione del file (case-insensitive)
//! 2. **Decode**: dal contenuto; errore di decode = nessuna modifica al file
//! 3. **Trasformazione**: in memoria, il tipo colore non cambia
//! 4. **Encode atomico**: scrittura su file temporaneo + rename sull'originale
//!
//! ## Error Handling
//!
//! Ogni invocazione è indipendente: l'errore resta confinato al file e viene
//! restituito al chiamante come `ProcessError`, senza panic e senza side effect
//! parziali (mai file a lunghezza zero).
//!
//! ## Dry run
//!
//! Con `dry_run = true` Resize e Invert decodificano comunque il file (per
//! segnalare immagini corrotte), Delete e CopyTo controllano solo il sorgente.
//! Nessun file viene toccato.
//!
//! ## Esempio
//!
//! ```rust,ignore
//! let processor = ImageProcessor::new(Operation::Invert, false);
//! let outcome = processor.apply(Path::new("/photos/a.png"))?;
//! println!("{}", outcome);
//! ```

use crate::config::Operation;
use crate::error::ProcessError;
use crate::file_manager::FileManager;
use crate::resize;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What happened to one file
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Resized { width: u32, height: u32, bytes: u64 },
    Inverted { bytes: u64 },
    Deleted { bytes: u64 },
    Copied { destination: PathBuf, bytes: u64 },
    /// Nothing was touched; describes what would have happened
    DryRun(String),
}

impl Outcome {
    /// Bytes written (or, for delete, freed) by the operation
    pub fn bytes(&self) -> u64 {
        match self {
            Outcome::Resized { bytes, .. }
            | Outcome::Inverted { bytes }
            | Outcome::Deleted { bytes }
            | Outcome::Copied { bytes, .. } => *bytes,
            Outcome::DryRun(_) => 0,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Resized { width, height, .. } => write!(f, "resized to {}x{}", width, height),
            Outcome::Inverted { .. } => write!(f, "inverted"),
            Outcome::Deleted { .. } => write!(f, "deleted"),
            Outcome::Copied { destination, .. } => write!(f, "copied to {}", destination.display()),
            Outcome::DryRun(description) => write!(f, "dry run: {}", description),
        }
    }
}

/// Applies the configured operation to single files.
///
/// Holds no per-file state, so one instance is shared by every worker.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    operation: Operation,
    dry_run: bool,
}

impl ImageProcessor {
    pub fn new(operation: Operation, dry_run: bool) -> Self {
        Self { operation, dry_run }
    }

    /// Apply the operation to `path`. Blocking: call it off the async executor.
    pub fn apply(&self, path: &Path) -> Result<Outcome, ProcessError> {
        debug!("Applying {} to {}", self.operation, path.display());

        match &self.operation {
            Operation::Resize { factor } => self.resize(path, *factor),
            Operation::Invert => self.invert(path),
            Operation::Delete => self.delete(path),
            Operation::CopyTo { target_dir } => self.copy_to(path, target_dir),
        }
    }

    fn resize(&self, path: &Path, factor: f64) -> Result<Outcome, ProcessError> {
        let (image, format) = Self::decode(path)?;
        let resized = resize::resize_by_factor(&image, factor)?;
        let (width, height) = resized.dimensions();

        if self.dry_run {
            let (old_width, old_height) = image.dimensions();
            return Ok(Outcome::DryRun(format!(
                "would resize {}x{} to {}x{}",
                old_width, old_height, width, height
            )));
        }

        let bytes = Self::encode_in_place(&resized, path, format)?;
        Ok(Outcome::Resized { width, height, bytes })
    }

    fn invert(&self, path: &Path) -> Result<Outcome, ProcessError> {
        let (mut image, format) = Self::decode(path)?;

        if self.dry_run {
            return Ok(Outcome::DryRun("would invert colors".to_string()));
        }

        invert_colors(&mut image);
        let bytes = Self::encode_in_place(&image, path, format)?;
        Ok(Outcome::Inverted { bytes })
    }

    fn delete(&self, path: &Path) -> Result<Outcome, ProcessError> {
        let bytes = std::fs::metadata(path)?.len();

        if self.dry_run {
            return Ok(Outcome::DryRun("would delete".to_string()));
        }

        std::fs::remove_file(path)?;
        Ok(Outcome::Deleted { bytes })
    }

    fn copy_to(&self, path: &Path, target_dir: &Path) -> Result<Outcome, ProcessError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| ProcessError::UnsupportedFormat(format!("No file name: {}", path.display())))?;
        let destination = target_dir.join(file_name);

        // fs::copy onto the source itself would truncate it
        if destination.exists() && path.canonicalize()? == destination.canonicalize()? {
            return Err(ProcessError::SameFile(destination));
        }

        if self.dry_run {
            std::fs::metadata(path)?;
            return Ok(Outcome::DryRun(format!("would copy to {}", destination.display())));
        }

        let bytes = std::fs::copy(path, &destination)?;
        Ok(Outcome::Copied { destination, bytes })
    }

    /// Decode `path` by sniffing its content.
    ///
    /// The returned format comes from the file's extension and is the one the
    /// result gets written back in, so a PNG named `photo.jpg` is saved as JPEG.
    pub fn decode(path: &Path) -> Result<(DynamicImage, ImageFormat), ProcessError> {
        let format = FileManager::extension_of(path)
            .and_then(ImageFormat::from_extension)
            .ok_or_else(|| ProcessError::UnsupportedFormat(path.display().to_string()))?;

        let image = image::io::Reader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|source| ProcessError::Decode { path: path.to_path_buf(), source })?;

        Ok((image, format))
    }

    /// Encode `image` as `format` and atomically replace `path` with it
    pub fn encode_in_place(image: &DynamicImage, path: &Path, format: ImageFormat) -> Result<u64, ProcessError> {
        let mut encode_error = None;

        let written = FileManager::replace_atomically(path, |writer| {
            image.write_to(writer, format).map_err(|e| {
                let io_error = io::Error::new(io::ErrorKind::Other, e.to_string());
                encode_error = Some(e);
                io_error
            })
        });

        match (written, encode_error) {
            (Ok(bytes), _) => Ok(bytes),
            (Err(_), Some(source)) => Err(ProcessError::Encode { path: path.to_path_buf(), source }),
            (Err(e), None) => Err(ProcessError::Io(e)),
        }
    }
}

/// Replace every color channel `c` with `max - c`; alpha channels are left as they are
pub fn invert_colors(image: &mut DynamicImage) {
    image.invert();
}
