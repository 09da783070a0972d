//! Photo-strip chat-bot backend.
//!
//! Images received for a session are kept in the [`store::ImageStore`] until the
//! user confirms or declines. On confirmation the [`service::CollageService`]
//! stacks them into a square collage with [`photostrip_core::Composer`] and hands
//! the PNG to the configured [`sink::ImageSink`], whose URL is returned to the
//! caller.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod sink;
pub mod store;

pub use error::{Error, Result};
