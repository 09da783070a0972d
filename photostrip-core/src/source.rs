use std::io::Cursor;

use image::{ImageFormat, ImageReader, Limits, RgbaImage};

use crate::error::{CollageError, CollageResult};

/// Largest width or height accepted when decoding uploaded bytes.
pub const MAX_SOURCE_DIMENSION: u32 = 16_384;

/// An immutable decoded image waiting to be placed in a collage.
///
/// `rank` records arrival order and decides stacking order when images are
/// listed from a store. `id` is only used to find the image again.
#[derive(Debug, Clone)]
pub struct SourceImage {
    id: String,
    rank: i64,
    pixels: RgbaImage,
}

impl SourceImage {
    /// Wrap an already decoded raster. Rasters without pixels are rejected.
    pub fn new(id: impl Into<String>, rank: i64, pixels: RgbaImage) -> CollageResult<Self> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(CollageError::decode(format!(
                "image has no pixels ({}x{})",
                width, height
            )));
        }

        Ok(Self {
            id: id.into(),
            rank,
            pixels,
        })
    }

    /// Decode encoded bytes (PNG, JPEG, ...) into a source image.
    ///
    /// Images wider or taller than [`MAX_SOURCE_DIMENSION`], or needing more
    /// memory than the decoder's default allocation limit, are rejected.
    pub fn decode(id: impl Into<String>, rank: i64, bytes: &[u8]) -> CollageResult<Self> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CollageError::decode(e.to_string()))?;
        reader.limits(decode_limits());

        let decoded = reader
            .decode()
            .map_err(|e| CollageError::decode(e.to_string()))?;
        Self::new(id, rank, decoded.to_rgba8())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rank(&self) -> i64 {
        self.rank
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);
    limits
}

/// Identify the container format of encoded image bytes.
pub fn detect_format(bytes: &[u8]) -> CollageResult<ImageFormat> {
    image::guess_format(bytes).map_err(|e| CollageError::decode(e.to_string()))
}
