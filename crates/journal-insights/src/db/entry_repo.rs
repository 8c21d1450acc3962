//! Journal entry repository: the SQLite-backed [`EntryStore`].

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, parse_timestamp, Database, DatabaseError};
use crate::analysis::entry::{EntryStore, EntryStoreError, EntryType, JournalEntry};

fn entry_from_row(row: &Row<'_>) -> Result<JournalEntry, rusqlite::Error> {
    let entry_type: String = row.get("entry_type")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(JournalEntry {
        id: row.get("id")?,
        content: row.get("content")?,
        entry_type: entry_type.parse().unwrap_or_else(|other| {
            log::warn!("Unknown entry type '{}', treating as text", other);
            EntryType::Text
        }),
        audio_url: row.get("audio_url")?,
        is_draft: row.get("is_draft")?,
        is_deleted: row.get("is_deleted")?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

/// Inserts a new entry row.
pub fn insert(db: &Database, entry: &JournalEntry) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO journal_entries (id, content, entry_type, audio_url, is_draft,
             is_deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id,
                entry.content,
                entry.entry_type.as_str(),
                entry.audio_url,
                entry.is_draft,
                entry.is_deleted,
                format_timestamp(entry.created_at),
                format_timestamp(entry.updated_at),
            ],
        )?;
        Ok(())
    })
}

/// Finds an entry by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JournalEntry>, DatabaseError> {
    db.with_conn(|conn| {
        let entry = conn
            .query_row(
                "SELECT * FROM journal_entries WHERE id = ?1",
                params![id],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    })
}

/// Replaces the content of an entry. Returns whether a row was updated.
pub fn update_content(db: &Database, id: &str, content: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE journal_entries SET content = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, content, format_timestamp(Utc::now())],
        )?;
        Ok(changed > 0)
    })
}

/// Lists entries that are neither drafts nor deleted, oldest first.
pub fn find_published(db: &Database) -> Result<Vec<JournalEntry>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM journal_entries
             WHERE is_deleted = 0 AND is_draft = 0
             ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map([], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Marks an entry as deleted without removing it.
pub fn soft_delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE journal_entries SET is_deleted = 1, updated_at = ?2 WHERE id = ?1",
            params![id, format_timestamp(Utc::now())],
        )?;
        Ok(changed > 0)
    })
}

/// [`EntryStore`] over the local `journal_entries` table.
#[derive(Clone)]
pub struct EntryRepository {
    db: Database,
}

impl EntryRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntryStore for EntryRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<JournalEntry>, EntryStoreError> {
        Ok(find_by_id(&self.db, id)?)
    }

    async fn update_content(&self, id: &str, content: &str) -> Result<(), EntryStoreError> {
        if update_content(&self.db, id, content)? {
            Ok(())
        } else {
            Err(EntryStoreError::Unavailable(format!(
                "entry {} disappeared before its content was saved",
                id
            )))
        }
    }

    async fn find_published(&self) -> Result<Vec<JournalEntry>, EntryStoreError> {
        Ok(find_published(&self.db)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        let entry = JournalEntry::audio("http://localhost:3001/uploads/audio/morning.webm");
        insert(&db, &entry).unwrap();

        let found = find_by_id(&db, &entry.id).unwrap().unwrap();
        assert_eq!(found.entry_type, EntryType::Audio);
        assert_eq!(found.audio_url, entry.audio_url);
        assert!(found.content.is_empty());
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_by_id(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_update_content() {
        let db = test_db();
        let entry = JournalEntry::audio("a.wav");
        insert(&db, &entry).unwrap();

        assert!(update_content(&db, &entry.id, "transcribed words").unwrap());
        let found = find_by_id(&db, &entry.id).unwrap().unwrap();
        assert_eq!(found.content, "transcribed words");

        assert!(!update_content(&db, "missing", "x").unwrap());
    }

    #[test]
    fn test_find_published_skips_drafts_and_deleted() {
        let db = test_db();
        let published = JournalEntry::text("published");
        let mut draft = JournalEntry::text("draft");
        draft.is_draft = true;
        let deleted = JournalEntry::text("deleted");

        insert(&db, &published).unwrap();
        insert(&db, &draft).unwrap();
        insert(&db, &deleted).unwrap();
        assert!(soft_delete(&db, &deleted.id).unwrap());

        let rows = find_published(&db).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, published.id);
    }

    #[tokio::test]
    async fn test_repository_update_missing_entry_fails() {
        let repo = EntryRepository::new(test_db());
        let err = EntryStore::update_content(&repo, "missing", "text").await;
        assert!(matches!(err, Err(EntryStoreError::Unavailable(_))));
    }
}
