use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pending image waiting for its session to be confirmed or declined.
///
/// `rank` grows with every ingestion and is the only thing that decides where
/// the image lands in the strip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredImage {
    pub id: Uuid,
    pub session: String,
    pub rank: i64,
    pub width: u32,
    pub height: u32,
    /// MIME type sniffed from the uploaded bytes (e.g. `image/png`).
    pub content_type: String,
    pub received_at: DateTime<Utc>,
}

/// The bytes of a pending image exactly as they were received.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub content_type: String,
    pub data: Vec<u8>,
}
