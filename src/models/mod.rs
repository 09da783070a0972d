//! Records exchanged between the store, the service and the HTTP API.
//!
//! - [`StoredImage`]: metadata of a pending image, in arrival order per session.
//! - [`EncodedImage`]: the original bytes of a pending image.
//! - [`Decision`]: what happened when a session was confirmed or declined.
//! - [`Delivery`]: where a finished collage was delivered.

mod collage;
mod pending;

pub use collage::*;
pub use pending::*;
