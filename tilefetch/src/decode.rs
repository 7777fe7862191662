//! Tile image decoding.
//!
//! The loader never interprets tile bytes itself; it hands a reader to a
//! [`TileDecoder`] and stores whatever image comes back on the tile.

use image::DynamicImage;
use std::io::{self, Read};
use std::sync::Arc;
use thiserror::Error;

/// Decoded tile image.
///
/// Cheap to clone; all clones share the same pixel buffer.
#[derive(Debug, Clone)]
pub struct TileImage {
    image: Arc<DynamicImage>,
}

impl TileImage {
    /// Wrap a decoded image.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying image.
    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Errors produced while decoding tile bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Reading the tile bytes failed
    #[error("failed to read tile data: {0}")]
    Io(#[from] io::Error),

    /// The bytes are empty
    #[error("tile data is empty")]
    Empty,

    /// The bytes are not a supported image
    #[error("unsupported or corrupt tile image: {0}")]
    Image(#[from] image::ImageError),
}

/// Turns raw tile bytes into an image.
pub trait TileDecoder: Send + Sync {
    /// Decode a complete tile from `source`.
    fn decode(&self, source: &mut dyn Read) -> Result<TileImage, DecodeError>;
}

/// Decoder backed by the `image` crate; the format is guessed from the
/// content.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl TileDecoder for ImageDecoder {
    fn decode(&self, source: &mut dyn Read) -> Result<TileImage, DecodeError> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let image = image::load_from_memory(&bytes)?;
        Ok(TileImage::new(image))
    }
}
