use thiserror::Error;

/// Convenience result type for composition operations.
pub type CollageResult<T> = Result<T, CollageError>;

/// Errors produced while decoding, laying out or composing a collage.
#[derive(Debug, Error)]
pub enum CollageError {
    /// Input bytes are not a raster image, or the raster has no pixels.
    #[error("could not decode image: {0}")]
    Decode(String),

    /// Composition was requested with zero images.
    #[error("nothing to compose")]
    EmptyInput,

    /// More images than canvas rows; some band would have zero height.
    #[error("{count} images cannot share a {side}px canvas")]
    TooManyImages { count: usize, side: u32 },

    /// The finished canvas does not match its layout. Always a bug.
    #[error("collage invariant violated: {0}")]
    InvariantViolation(String),

    #[error("could not encode collage: {0}")]
    Encode(String),
}

impl CollageError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Whether the error is caused by the request's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::EmptyInput | Self::TooManyImages { .. }
        )
    }
}
