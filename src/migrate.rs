use anyhow::{Context, Result};
use jiff::tz::TimeZone;

use crate::guard::LEGACY_OWNER;
use crate::id::generate_id;
use crate::models::Comment;
use crate::store::{CommentStore, FileStore};
use crate::timefmt::parse_display_stamp;

/// One copied row: its id in the JSON file and its new document id.
#[derive(Debug, Clone, PartialEq)]
pub struct MigratedComment {
    pub source_id: String,
    pub id: String,
    pub name: String,
}

/// Copies every comment from the JSON file layout into `target`.
///
/// The creation time is recovered from each row's display stamp (read in
/// `tz`), `edited` is carried over, and every copy is owned by
/// [`LEGACY_OWNER`] so nobody can edit or delete it afterwards. All rows
/// are converted before the first write; a bad stamp aborts with nothing
/// copied.
pub fn migrate(
    source: &FileStore,
    target: &dyn CommentStore,
    tz: &TimeZone,
) -> Result<Vec<MigratedComment>> {
    let rows = source.read_all()?;
    tracing::info!(count = rows.len(), from = %source.path().display(), "migrating comments");

    let converted = rows
        .iter()
        .map(|row| {
            let created_at = parse_display_stamp(&row.last_modified_display, tz)
                .with_context(|| format!("Cannot migrate comment {}", row.id))?;
            Ok(Comment {
                id: generate_id(),
                name: row.name.clone(),
                text: row.text.clone(),
                last_modified_display: row.last_modified_display.clone(),
                created_at: Some(created_at),
                edited: row.edited,
                owner_token: Some(LEGACY_OWNER.to_string()),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // Oldest row first, so equal stamps keep the file's newest-first order.
    let mut migrated = Vec::with_capacity(converted.len());
    for (row, doc) in rows.iter().zip(converted).rev() {
        let entry = MigratedComment {
            source_id: row.id.clone(),
            id: doc.id.clone(),
            name: doc.name.clone(),
        };
        target
            .insert(doc)
            .with_context(|| format!("Failed to copy comment {}", row.id))?;
        tracing::debug!(from = %entry.source_id, to = %entry.id, "migrated comment");
        migrated.push(entry);
    }

    migrated.reverse();
    Ok(migrated)
}
