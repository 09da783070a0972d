//! SQLite-backed store of pending images.
//!
//! Images are kept per session key together with their original bytes. The
//! `rank` column is an autoincrement key, so arrival order survives restarts and
//! never depends on how rows happen to be listed.

mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use photostrip_core::{detect_format, SourceImage};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;

#[derive(Clone)]
pub struct ImageStore {
    conn: Arc<Mutex<Connection>>,
}

impl ImageStore {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Store path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("store lock poisoned");
        schema::run_migrations(&conn)
    }

    /// Decode `bytes` and append them to the session's pending images.
    ///
    /// Nothing is written when the bytes are not a usable image.
    pub fn add(&self, session: &str, bytes: &[u8]) -> Result<StoredImage> {
        let format = detect_format(bytes)?;
        let id = Uuid::new_v4();
        let decoded = SourceImage::decode(id.to_string(), 0, bytes)?;
        let content_type = format.to_mime_type().to_string();

        let conn = self.conn.lock().expect("store lock poisoned");
        let now = Utc::now();

        conn.execute(
            "INSERT INTO pending_images (id, session_key, width, height, content_type, data, received_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                session,
                decoded.width(),
                decoded.height(),
                &content_type,
                bytes,
                now.to_rfc3339(),
            ),
        )?;

        Ok(StoredImage {
            id,
            session: session.to_string(),
            rank: conn.last_insert_rowid(),
            width: decoded.width(),
            height: decoded.height(),
            content_type,
            received_at: now,
        })
    }

    /// Metadata of the session's pending images, oldest first.
    pub fn pending(&self, session: &str) -> Result<Vec<StoredImage>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT rank, id, session_key, width, height, content_type, received_at
             FROM pending_images WHERE session_key = ? ORDER BY rank",
        )?;

        let images = stmt
            .query_map([session], stored_image_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(images)
    }

    /// The session's pending images decoded and in arrival order.
    pub fn list_ordered(&self, session: &str) -> Result<Vec<SourceImage>> {
        let rows = {
            let conn = self.conn.lock().expect("store lock poisoned");
            let mut stmt = conn.prepare(
                "SELECT rank, id, data FROM pending_images WHERE session_key = ? ORDER BY rank",
            )?;
            let rows = stmt
                .query_map([session], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        // Decoding happens outside the connection lock.
        rows.into_iter()
            .map(|(rank, id, data)| SourceImage::decode(id, rank, &data).map_err(Error::from))
            .collect()
    }

    /// Remove every pending image of the session. Returns how many were removed.
    pub fn clear(&self, session: &str) -> Result<usize> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let rows = conn.execute(
            "DELETE FROM pending_images WHERE session_key = ?",
            [session],
        )?;
        Ok(rows)
    }

    pub fn fetch(&self, id: Uuid) -> Result<SourceImage> {
        let (rank, data) = {
            let conn = self.conn.lock().expect("store lock poisoned");
            conn.query_row(
                "SELECT rank, data FROM pending_images WHERE id = ?",
                [id.to_string()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)),
            )
            .optional()?
            .ok_or(Error::NotFound(id))?
        };

        Ok(SourceImage::decode(id.to_string(), rank, &data)?)
    }

    /// The original bytes of a pending image, as uploaded.
    pub fn fetch_encoded(&self, id: Uuid) -> Result<EncodedImage> {
        let conn = self.conn.lock().expect("store lock poisoned");
        conn.query_row(
            "SELECT content_type, data FROM pending_images WHERE id = ?",
            [id.to_string()],
            |row| {
                Ok(EncodedImage {
                    content_type: row.get(0)?,
                    data: row.get(1)?,
                })
            },
        )
        .optional()?
        .ok_or(Error::NotFound(id))
    }
}

fn stored_image_from_row(row: &Row<'_>) -> rusqlite::Result<StoredImage> {
    Ok(StoredImage {
        rank: row.get(0)?,
        id: parse_uuid(row.get::<_, String>(1)?),
        session: row.get(2)?,
        width: row.get(3)?,
        height: row.get(4)?,
        content_type: row.get(5)?,
        received_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
