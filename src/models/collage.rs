use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The user's answer to "make a collage from these photos?".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionInput {
    pub confirm: bool,
}

/// A collage that was composed and handed to the image sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    /// Where the PNG can be retrieved. This is what the end user gets to see.
    pub url: String,
    pub image_count: usize,
    pub side_length: u32,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a confirm or decline signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    Composed(Delivery),
    Declined { discarded: usize },
}
