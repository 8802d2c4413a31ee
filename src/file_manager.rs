//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file condivise dalle varie operazioni.
//!
//! ## Responsabilità:
//! - Filtro di eleggibilità: file regolare con estensione immagine riconosciuta
//! - Sostituzione atomica di un file (temp file + rename nella stessa directory)
//! - Utilità per la formattazione human-readable delle dimensioni
//!
//! ## Formati riconosciuti:
//! - **Immagini**: JPG, JPEG, PNG, BMP (case-insensitive)
//!
//! ## Sicurezza operazioni:
//! - Il contenuto nuovo viene scritto in un file temporaneo accanto all'originale
//! - Solo a scrittura completata il temporaneo viene rinominato sull'originale
//! - Un errore a metà scrittura lascia l'originale intatto (mai file a lunghezza zero)
//! - I permessi dell'originale vengono riapplicati al file sostituito
//!
//! ## Esempio:
//! ```rust,ignore
//! if FileManager::is_eligible(&entry) {
//!     FileManager::replace_atomically(entry.path(), |writer| {
//!         image.write_to(writer, format).map_err(Into::into)
//!     })?;
//! }
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use walkdir::DirEntry;

/// Extensions (lowercase, without the dot) of the files a run processes
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Prefix of the temporary files written next to the file being replaced
const TEMP_PREFIX: &str = ".image-batch-";

/// Manages file operations and eligibility
pub struct FileManager;

impl FileManager {
    /// Lowercased text after the last `.` of the file name.
    ///
    /// Unlike `Path::extension`, a dotfile such as `.png` yields `png`.
    pub fn extension_of(path: &Path) -> Option<String> {
        let name = path.file_name()?.to_string_lossy();
        let (_, ext) = name.rsplit_once('.')?;
        Some(ext.to_lowercase())
    }

    /// Check if a path carries one of the recognized image extensions
    pub fn has_image_extension(path: &Path) -> bool {
        match Self::extension_of(path) {
            Some(ext) => IMAGE_EXTENSIONS.contains(&ext.as_str()),
            None => false,
        }
    }

    /// Check if a walked entry is a regular file with an image extension
    pub fn is_eligible(entry: &DirEntry) -> bool {
        entry.file_type().is_file() && Self::has_image_extension(entry.path())
    }

    /// Replace `path` with the bytes produced by `write`, atomically.
    ///
    /// The content goes to a temporary file in the same directory, which is
    /// renamed over `path` only once `write` succeeded and the data is flushed.
    /// Returns the size of the new file.
    pub fn replace_atomically<F>(path: &Path, write: F) -> io::Result<u64>
    where
        F: FnOnce(&mut BufWriter<&mut File>) -> io::Result<()>,
    {
        // Through a symlink the file it points at is replaced, the link stays
        let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let permissions = std::fs::metadata(&target).ok().map(|m| m.permissions());

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(parent)?;

        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            write(&mut writer)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        let size = temp.as_file().metadata()?.len();

        // NamedTempFile is created 0600; give the replacement the original's mode
        if let Some(permissions) = permissions {
            temp.as_file().set_permissions(permissions)?;
        }

        temp.persist(&target).map_err(|e| e.error)?;
        Ok(size)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
