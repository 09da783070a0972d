//! Vertical photo-strip composition.
//!
//! # Core Concepts
//!
//! - [`SourceImage`]: a decoded raster with its arrival rank and an opaque id.
//! - [`Band`]: a horizontal slice of the square canvas owned by one source image.
//!   Bands are contiguous, never overlap, and their heights sum to the canvas side.
//! - [`Composer`]: scales every source image to the canvas width, center-crops
//!   (or pads) it to its band height, and stacks the bands top-to-bottom.
//! - [`Collage`]: the finalized canvas together with the layout that produced it.
//!
//! Nothing in this crate performs I/O; storage and delivery live in the
//! `photostrip` service crate.

mod composer;
mod error;
mod layout;
mod source;

pub use composer::*;
pub use error::*;
pub use layout::*;
pub use source::*;
