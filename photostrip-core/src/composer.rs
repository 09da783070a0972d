use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{CollageError, CollageResult};
use crate::layout::{band_layout, check_layout, Band};
use crate::source::SourceImage;

/// Side length of the square canvas when nothing else is configured.
pub const DEFAULT_SIDE_LENGTH: u32 = 1080;

/// Resampling filter used when scaling source images to the canvas width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    #[default]
    CatmullRom,
    Lanczos3,
}

impl ResizeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Triangle => "triangle",
            Self::CatmullRom => "catmull-rom",
            Self::Lanczos3 => "lanczos3",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "nearest" => Some(Self::Nearest),
            "triangle" => Some(Self::Triangle),
            "catmull-rom" => Some(Self::CatmullRom),
            "lanczos3" => Some(Self::Lanczos3),
            _ => None,
        }
    }

    fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Height of an image after scaling it uniformly to `side` pixels wide.
///
/// Rounds half up and never returns 0. A zero `width` is treated as 1.
pub fn scaled_height(width: u32, height: u32, side: u32) -> u32 {
    let (w, h, s) = ((width as u64).max(1), height as u64, side as u64);
    let rounded = (h * s * 2 + w) / (w * 2);
    rounded.clamp(1, u32::MAX as u64) as u32
}

/// Stacks source images into a square photo strip.
///
/// Each image is scaled to the full canvas width and then center-cropped to its
/// band. The crop is taken from the source before resizing, so memory stays
/// bounded by the canvas. An image too short to fill its band is centered in it over the
/// background color instead of being stretched.
#[derive(Debug, Clone)]
pub struct Composer {
    side: u32,
    filter: ResizeFilter,
    background: Rgba<u8>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(DEFAULT_SIDE_LENGTH)
    }
}

impl Composer {
    pub fn new(side: u32) -> Self {
        Self {
            side,
            filter: ResizeFilter::default(),
            background: Rgba([0, 0, 0, 255]),
        }
    }

    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_background(mut self, rgba: [u8; 4]) -> Self {
        self.background = Rgba(rgba);
        self
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    /// Compose `images` top-to-bottom in the order given.
    pub fn compose(&self, images: &[SourceImage]) -> CollageResult<Collage> {
        let bands = band_layout(self.side, images.len())?;
        let mut canvas = RgbaImage::from_pixel(self.side, self.side, self.background);

        for (image, band) in images.iter().zip(&bands) {
            let strip = self.render_band(image, band.height)?;
            tracing::debug!(
                "Placing image {} (rank {}) at rows {}..{}",
                image.id(),
                image.rank(),
                band.top,
                band.bottom()
            );
            imageops::replace(&mut canvas, &strip, 0, band.top as i64);
        }

        check_layout(self.side, &bands)?;
        if canvas.dimensions() != (self.side, self.side) {
            let (w, h) = canvas.dimensions();
            return Err(CollageError::invariant(format!(
                "canvas is {}x{}, expected {}x{}",
                w, h, self.side, self.side
            )));
        }

        Ok(Collage { canvas, bands })
    }

    /// Scale `image` to the canvas width and fit it to `band_height` rows.
    fn render_band(&self, image: &SourceImage, band_height: u32) -> CollageResult<RgbaImage> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(CollageError::decode(format!(
                "image {} has no pixels ({}x{})",
                image.id(),
                width,
                height
            )));
        }

        let new_height = scaled_height(width, height, self.side);
        let filter = self.filter.filter_type();

        if new_height >= band_height {
            // Crop in source coordinates first so the resized buffer never
            // exceeds the band, however narrow the source is.
            let rows = source_rows(band_height, width, self.side).min(height);
            let top = (height - rows) / 2;
            let window = imageops::crop_imm(image.pixels(), 0, top, width, rows).to_image();
            return Ok(imageops::resize(&window, self.side, band_height, filter));
        }

        let scaled = imageops::resize(image.pixels(), self.side, new_height, filter);
        let mut band = RgbaImage::from_pixel(self.side, band_height, self.background);
        let top = (band_height - new_height) / 2;
        imageops::replace(&mut band, &scaled, 0, top as i64);
        Ok(band)
    }
}

/// Source rows that cover `band_height` canvas rows once an image `width`
/// pixels wide is scaled to `side`. Rounds half up and never returns 0.
fn source_rows(band_height: u32, width: u32, side: u32) -> u32 {
    let (b, w, s) = (band_height as u64, width as u64, (side as u64).max(1));
    ((b * w * 2 + s) / (s * 2)).clamp(1, u32::MAX as u64) as u32
}

/// A finished collage and the band layout it was built from.
#[derive(Debug, Clone)]
pub struct Collage {
    canvas: RgbaImage,
    bands: Vec<Band>,
}

impl Collage {
    pub fn side(&self) -> u32 {
        self.canvas.width()
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn to_png(&self) -> CollageResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.canvas
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| CollageError::Encode(e.to_string()))?;
        Ok(buf)
    }
}
