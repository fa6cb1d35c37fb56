//! Fiducial marker generation.
//!
//! [`GridMarkerEncoder`] draws square binary markers: a 4x4 grid of data
//! cells inside a one-cell black border, 6x6 cells in total. White cells
//! are `1` bits. The 16-bit codewords come from a [`Codebook`] built
//! greedily so that any two markers, and any marker and its own
//! rotations, differ in at least [`MIN_CODE_DISTANCE`] cells under every
//! quarter turn. A camera can therefore recover both id and orientation.
//!
//! Generation is a pure function of `(id, size)`. The session start-up
//! runs [`verify_deterministic`] as a pre-scan check.

use std::path::{Path, PathBuf};

use gazemark_types::Bitmap;
use tracing::{debug, info};

use crate::error::ConfigurationError;

/// Cells per marker side, border included.
pub const GRID_CELLS: u32 = 6;

/// Minimum rotation-aware Hamming distance between codewords.
pub const MIN_CODE_DISTANCE: u32 = 4;

/// Number of codewords in the default codebook.
pub const DEFAULT_CODEBOOK_LEN: usize = 50;

/// Destination bit for each source bit of a 4x4 grid turned a quarter
/// clockwise (bit index = `row * 4 + col`).
const QUARTER_TURN: [u32; 16] = [3, 7, 11, 15, 2, 6, 10, 14, 1, 5, 9, 13, 0, 4, 8, 12];

const BLACK: u8 = 0;
const WHITE: u8 = 255;

/// Errors from marker generation and export.
#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    /// The id or size is unusable.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Two generations of the same marker differed.
    #[error("marker {id} at {size}px is not reproducible")]
    NonDeterministic {
        /// Marker id.
        id: u32,
        /// Side length in pixels.
        size: u32,
    },

    /// The bitmap dimensions overflow the address space.
    #[error("marker of {size}px is too large")]
    TooLarge {
        /// Side length in pixels.
        size: u32,
    },

    /// Writing the PNG failed.
    #[error("failed to export marker to {path}: {source}")]
    Export {
        /// Destination file.
        path: PathBuf,
        /// Underlying image error.
        source: image::ImageError,
    },
}

/// Produces square marker bitmaps.
pub trait FiducialEncoder {
    /// Render marker `id` as a `size` x `size` grayscale bitmap.
    ///
    /// Must return byte-identical output for equal arguments.
    fn generate(&self, id: u32, size: u32) -> Result<Bitmap, MarkerError>;

    /// Number of distinct ids this encoder can draw.
    fn capacity(&self) -> usize;
}

/// Rotate a 4x4 bit grid a quarter turn clockwise.
pub fn rotate_quarter(word: u16) -> u16 {
    QUARTER_TURN
        .iter()
        .enumerate()
        .fold(0_u16, |acc, (src, &dst)| {
            let src = u32::try_from(src).unwrap_or(0);
            if word.wrapping_shr(src) & 1 == 1 {
                acc | 1_u16.wrapping_shl(dst)
            } else {
                acc
            }
        })
}

/// The word and its three quarter turns.
pub fn rotations(word: u16) -> [u16; 4] {
    let r1 = rotate_quarter(word);
    let r2 = rotate_quarter(r1);
    let r3 = rotate_quarter(r2);
    [word, r1, r2, r3]
}

/// Smallest Hamming distance between `a` and any rotation of `b`.
pub fn rotation_distance(a: u16, b: u16) -> u32 {
    rotations(b)
        .iter()
        .map(|r| (a ^ r).count_ones())
        .min()
        .unwrap_or(0)
}

/// Smallest Hamming distance between `word` and its own non-trivial
/// rotations. Low values mean the orientation is ambiguous.
pub fn self_rotation_distance(word: u16) -> u32 {
    rotations(word)
        .iter()
        .skip(1)
        .map(|r| (word ^ r).count_ones())
        .min()
        .unwrap_or(0)
}

/// An ordered list of 16-bit codewords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codebook {
    words: Vec<u16>,
}

impl Codebook {
    /// Greedily pick up to `len` words in ascending order, keeping only
    /// words at least `min_distance` from every earlier pick and from
    /// their own rotations.
    pub fn generate(len: usize, min_distance: u32) -> Self {
        let mut words: Vec<u16> = Vec::with_capacity(len);
        for candidate in 0..=u16::MAX {
            if words.len() >= len {
                break;
            }
            if self_rotation_distance(candidate) < min_distance {
                continue;
            }
            if words
                .iter()
                .all(|&w| rotation_distance(candidate, w) >= min_distance)
            {
                words.push(candidate);
            }
        }
        debug!(len = words.len(), min_distance, "Codebook generated");
        Self { words }
    }

    /// Codeword for `id`.
    pub fn word(&self, id: u32) -> Option<u16> {
        self.words.get(usize::try_from(id).ok()?).copied()
    }

    /// All codewords, in id order.
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Number of codewords.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the codebook is empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for Codebook {
    fn default() -> Self {
        Self::generate(DEFAULT_CODEBOOK_LEN, MIN_CODE_DISTANCE)
    }
}

/// Built-in 6x6 grid marker encoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridMarkerEncoder {
    codebook: Codebook,
}

impl GridMarkerEncoder {
    /// Encoder over the default codebook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder over a custom codebook.
    pub const fn with_codebook(codebook: Codebook) -> Self {
        Self { codebook }
    }

    /// The codebook in use.
    pub const fn codebook(&self) -> &Codebook {
        &self.codebook
    }
}

impl FiducialEncoder for GridMarkerEncoder {
    fn generate(&self, id: u32, size: u32) -> Result<Bitmap, MarkerError> {
        if size == 0 {
            return Err(ConfigurationError::ZeroSizeMarker {
                width: size,
                height: size,
            }
            .into());
        }
        let word = self
            .codebook
            .word(id)
            .ok_or(ConfigurationError::MarkerIdOutOfRange {
                id,
                capacity: self.codebook.len(),
            })?;

        let area = u64::from(size)
            .checked_mul(u64::from(size))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(MarkerError::TooLarge { size })?;
        let mut pixels = Vec::with_capacity(area);
        for y in 0..size {
            let row = cell_index(y, size);
            for x in 0..size {
                pixels.push(cell_value(word, row, cell_index(x, size)));
            }
        }

        Bitmap::from_raw(size, size, pixels).ok_or(MarkerError::TooLarge { size })
    }

    fn capacity(&self) -> usize {
        self.codebook.len()
    }
}

/// Which of the [`GRID_CELLS`] cells pixel `p` falls into.
fn cell_index(p: u32, size: u32) -> u32 {
    u64::from(p)
        .saturating_mul(u64::from(GRID_CELLS))
        .checked_div(u64::from(size))
        .and_then(|c| u32::try_from(c).ok())
        .unwrap_or(0)
}

fn cell_value(word: u16, row: u32, col: u32) -> u8 {
    let border = GRID_CELLS.saturating_sub(1);
    if row == 0 || col == 0 || row >= border || col >= border {
        return BLACK;
    }
    let bit = row
        .saturating_sub(1)
        .saturating_mul(4)
        .saturating_add(col.saturating_sub(1));
    if word.wrapping_shr(bit) & 1 == 1 {
        WHITE
    } else {
        BLACK
    }
}

/// Generate the marker twice and check the results match.
///
/// # Errors
///
/// Returns [`MarkerError::NonDeterministic`] on mismatch, or any
/// generation error.
pub fn verify_deterministic(
    encoder: &dyn FiducialEncoder,
    id: u32,
    size: u32,
) -> Result<Bitmap, MarkerError> {
    let first = encoder.generate(id, size)?;
    let second = encoder.generate(id, size)?;
    if first != second {
        return Err(MarkerError::NonDeterministic { id, size });
    }
    debug!(id, size, "Marker generation is reproducible");
    Ok(first)
}

/// Write a marker bitmap as an 8-bit grayscale PNG.
///
/// # Errors
///
/// Returns [`MarkerError::Export`] if the file cannot be written.
pub fn export_png(bitmap: &Bitmap, path: &Path) -> Result<(), MarkerError> {
    let (width, height) = (bitmap.width(), bitmap.height());
    let image = image::GrayImage::from_raw(width, height, bitmap.pixels().to_vec())
        .ok_or(MarkerError::TooLarge { size: width })?;
    image.save(path).map_err(|source| MarkerError::Export {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Marker exported");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turn_four_times_is_identity() {
        for word in [0x0003_u16, 0x1234, 0xBEEF, 0x8001] {
            let r = rotations(word);
            assert_eq!(rotate_quarter(r[3]), word);
        }
        // Top-left corner goes to top-right.
        assert_eq!(rotate_quarter(0x0001), 0x0008);
    }

    #[test]
    fn default_codebook_is_well_separated() {
        let cb = Codebook::default();
        assert_eq!(cb.len(), DEFAULT_CODEBOOK_LEN);
        assert_eq!(cb.word(0), Some(0x0003));
        for (i, &a) in cb.words().iter().enumerate() {
            assert!(self_rotation_distance(a) >= MIN_CODE_DISTANCE);
            for &b in cb.words().iter().skip(i.saturating_add(1)) {
                assert!(rotation_distance(a, b) >= MIN_CODE_DISTANCE);
            }
        }
    }

    #[test]
    fn marker_has_border_and_data_cells() {
        let encoder = GridMarkerEncoder::new();
        let bmp = encoder.generate(0, 60).unwrap();
        assert_eq!(bmp.width(), 60);
        assert_eq!(bmp.pixels().len(), 3600);
        // Border.
        assert_eq!(bmp.pixel(0, 0), Some(BLACK));
        assert_eq!(bmp.pixel(59, 30), Some(BLACK));
        // Word 0x0003: first two data cells of the first row are white.
        assert_eq!(bmp.pixel(15, 15), Some(WHITE));
        assert_eq!(bmp.pixel(25, 15), Some(WHITE));
        assert_eq!(bmp.pixel(35, 15), Some(BLACK));
        assert_eq!(bmp.pixel(15, 25), Some(BLACK));
    }

    #[test]
    fn generation_is_deterministic() {
        let encoder = GridMarkerEncoder::new();
        let a = verify_deterministic(&encoder, 7, 300).unwrap();
        let b = encoder.generate(7, 300).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, encoder.generate(8, 300).unwrap());
    }

    #[test]
    fn unknown_id_and_zero_size_are_rejected() {
        let encoder = GridMarkerEncoder::new();
        assert!(matches!(
            encoder.generate(50, 100),
            Err(MarkerError::Configuration(
                ConfigurationError::MarkerIdOutOfRange { id: 50, capacity: 50 }
            ))
        ));
        assert!(matches!(
            encoder.generate(0, 0),
            Err(MarkerError::Configuration(
                ConfigurationError::ZeroSizeMarker { .. }
            ))
        ));
    }

    #[test]
    fn uneven_size_still_covers_every_pixel() {
        let encoder = GridMarkerEncoder::new();
        let bmp = encoder.generate(3, 301).unwrap();
        assert_eq!(bmp.pixels().len(), 301 * 301);
        assert_eq!(bmp.pixel(300, 300), Some(BLACK));
    }

    #[test]
    fn png_export_round_trips_dimensions() {
        let encoder = GridMarkerEncoder::new();
        let bmp = encoder.generate(1, 60).unwrap();
        let path = std::env::temp_dir().join(format!("gazemark-marker-{}.png", std::process::id()));
        export_png(&bmp, &path).unwrap();
        let loaded = image::open(&path).unwrap().to_luma8();
        assert_eq!(loaded.dimensions(), (60, 60));
        assert_eq!(loaded.into_raw(), bmp.into_pixels());
        let _ = std::fs::remove_file(&path);
    }
}
