//! # Image Resize Module
//!
//! Questo modulo gestisce il ridimensionamento in memoria dei raster decodificati.
//!
//! ## Caratteristiche
//! - **Dimensioni arrotondate**: `round(width * factor)` × `round(height * factor)`,
//!   arrotondamento (non troncamento), metà lontano da zero
//! - **Interpolazione bilineare**: `FilterType::Triangle` del crate `image`
//! - **Nessun cambio di formato**: il tipo colore del raster resta quello originale
//! - **Dimensioni non valide**: zero o oltre `u32::MAX` diventano un errore per file
//! - **Limite di memoria**: un resize che richiederebbe più di `MAX_RESIZE_BYTES`
//!   fallisce prima di allocare, così un fattore enorme non abbatte il processo

use crate::error::ProcessError;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Filter used for every resize: linear in both directions
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Upper bound on the buffers one resize may allocate
pub const MAX_RESIZE_BYTES: u64 = 1 << 30;

/// Bytes per pixel of the `f32` RGBA buffer the separable filter samples into
const INTERMEDIATE_BYTES_PER_PIXEL: u64 = 16;

/// Bytes allocated by resizing a `width`x`height` raster to `new_width`x`new_height`.
///
/// The vertical pass writes a `width`x`new_height` float buffer, the horizontal
/// pass the final raster.
fn resize_footprint(width: u32, new_width: u32, new_height: u32, bytes_per_pixel: u8) -> u64 {
    let intermediate = (width as u64)
        .saturating_mul(new_height as u64)
        .saturating_mul(INTERMEDIATE_BYTES_PER_PIXEL);
    let output = (new_width as u64)
        .saturating_mul(new_height as u64)
        .saturating_mul(bytes_per_pixel as u64);
    intermediate.saturating_add(output)
}

/// Compute the target dimensions for `factor`, rounding each side to the nearest pixel
pub fn scaled_dimensions(width: u32, height: u32, factor: f64) -> Result<(u32, u32), ProcessError> {
    let scale = |side: u32| -> Option<u32> {
        let scaled = (side as f64 * factor).round();
        if scaled.is_finite() && scaled >= 1.0 && scaled <= u32::MAX as f64 {
            Some(scaled as u32)
        } else {
            None
        }
    };

    match (scale(width), scale(height)) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(ProcessError::InvalidDimensions { width, height, factor }),
    }
}

/// Resize `image` by `factor` with bilinear interpolation
pub fn resize_by_factor(image: &DynamicImage, factor: f64) -> Result<DynamicImage, ProcessError> {
    let (width, height) = image.dimensions();
    let (new_width, new_height) = scaled_dimensions(width, height, factor)?;

    if (new_width, new_height) == (width, height) {
        return Ok(image.clone());
    }

    let footprint = resize_footprint(width, new_width, new_height, image.color().bytes_per_pixel());
    if footprint > MAX_RESIZE_BYTES {
        return Err(ProcessError::InvalidDimensions { width, height, factor });
    }

    Ok(image.resize_exact(new_width, new_height, RESIZE_FILTER))
}
