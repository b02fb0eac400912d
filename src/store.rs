//! SQLite storage for the catalog and imported clips.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::models::{CatalogSong, ClipRecord, ExistingClipRef, SongAliases};
use crate::pipeline::ClipStore;
use crate::video::video_key;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS songs (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        title_aliases TEXT NOT NULL DEFAULT '[]',
        artist_aliases TEXT NOT NULL DEFAULT '[]',
        search_tags TEXT NOT NULL DEFAULT '[]'
    );

    CREATE TABLE IF NOT EXISTS clips (
        id INTEGER PRIMARY KEY,
        song_id TEXT NOT NULL REFERENCES songs(id),
        video_url TEXT NOT NULL,
        video_id TEXT NOT NULL,
        sung_date TEXT NOT NULL,
        description TEXT NOT NULL,
        start_sec INTEGER NOT NULL,
        end_sec INTEGER,
        CHECK (end_sec IS NULL OR end_sec > start_sec)
    );

    CREATE INDEX IF NOT EXISTS idx_clips_video ON clips(video_id, start_sec);
";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;",
        )?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .context("Failed to create schema")
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Insert or replace songs from a JSON array of `CatalogSong`.
    pub fn import_catalog_json(&mut self, json: &str) -> Result<usize> {
        let songs: Vec<CatalogSong> =
            serde_json::from_str(json).context("Catalog is not a JSON array of songs")?;
        self.upsert_songs(&songs)?;
        Ok(songs.len())
    }

    pub fn upsert_songs(&mut self, songs: &[CatalogSong]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO songs (id, title, artist, title_aliases, artist_aliases, search_tags)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for song in songs {
                stmt.execute(params![
                    song.id,
                    song.title,
                    song.artist,
                    serde_json::to_string(&song.aliases.title_aliases)?,
                    serde_json::to_string(&song.aliases.artist_aliases)?,
                    serde_json::to_string(&song.search_tags)?,
                ])?;
            }
        }
        tx.commit()?;
        log::info!("stored {} catalog songs", songs.len());
        Ok(())
    }

    pub fn load_catalog(&self) -> Result<Vec<CatalogSong>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, artist, title_aliases, artist_aliases, search_tags
             FROM songs ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut songs = Vec::new();
        for row in rows {
            let (id, title, artist, title_aliases, artist_aliases, search_tags) = row?;
            let decode = |column: &str, text: &str| -> Result<Vec<String>> {
                serde_json::from_str(text)
                    .with_context(|| format!("Bad {} JSON for song {}", column, id))
            };
            songs.push(CatalogSong {
                aliases: SongAliases {
                    title_aliases: decode("title_aliases", &title_aliases)?,
                    artist_aliases: decode("artist_aliases", &artist_aliases)?,
                },
                search_tags: decode("search_tags", &search_tags)?,
                id,
                title,
                artist,
            });
        }
        Ok(songs)
    }

    pub fn song_exists(&self, song_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM songs WHERE id = ?1", [song_id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    // ========================================================================
    // Clips
    // ========================================================================

    /// Every stored clip start for one video, for building a `Deduplicator`.
    pub fn load_existing_clips(&self, video_id: &str) -> Result<Vec<ExistingClipRef>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT video_id, start_sec FROM clips WHERE video_id = ?1")?;
        let clips = stmt
            .query_map([video_id], |row| {
                Ok(ExistingClipRef {
                    video_id: row.get(0)?,
                    start_seconds: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(clips)
    }

    pub fn clip_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM clips", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Insert every record in one transaction. A failing statement is rolled
    /// back on its own; the others still commit.
    fn insert_all(&mut self, records: &[ClipRecord]) -> Result<Vec<Result<(), String>>> {
        let tx = self.conn.transaction()?;
        let mut outcomes = Vec::with_capacity(records.len());
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO clips (song_id, video_url, video_id, sung_date, description, start_sec, end_sec)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for record in records {
                let Some(video_id) = video_key(&record.video_url) else {
                    outcomes.push(Err("blank video target".to_string()));
                    continue;
                };
                let outcome = stmt
                    .execute(params![
                        record.song_id,
                        record.video_url,
                        video_id,
                        record.sung_date.format("%Y-%m-%d").to_string(),
                        record.description,
                        record.start_seconds,
                        record.end_seconds,
                    ])
                    .map(|_| ())
                    .map_err(|e| e.to_string());
                outcomes.push(outcome);
            }
        }
        tx.commit()?;
        Ok(outcomes)
    }
}

impl ClipStore for SqliteStore {
    fn insert_clips(&mut self, records: &[ClipRecord]) -> Vec<Result<(), String>> {
        match self.insert_all(records) {
            Ok(outcomes) => outcomes,
            Err(e) => {
                log::error!("clip insert transaction failed: {:#}", e);
                let message = format!("transaction failed: {}", e);
                vec![Err(message); records.len()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const CATALOG: &str = r#"[
        {"id": "s1", "title": "난춘", "artist": "새소년",
         "aliases": {"title_aliases": ["Nan Chun"]}, "search_tags": ["난춘새소년"]},
        {"id": "s2", "title": "청춘만화", "artist": "이무진"}
    ]"#;

    fn record(song_id: &str, start: u32, end: Option<u32>) -> ClipRecord {
        ClipRecord {
            song_id: song_id.into(),
            video_url: "https://www.youtube.com/watch?v=abcdefghijk".into(),
            sung_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            description: "test".into(),
            start_seconds: start,
            end_seconds: end,
        }
    }

    fn store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.import_catalog_json(CATALOG).unwrap();
        store
    }

    #[test]
    fn test_catalog_roundtrip() {
        let store = store();
        let catalog = store.load_catalog().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].aliases.title_aliases, vec!["Nan Chun".to_string()]);
        assert_eq!(catalog[0].search_tags, vec!["난춘새소년".to_string()]);
        assert!(catalog[1].aliases.artist_aliases.is_empty());
        assert!(store.song_exists("s2").unwrap());
        assert!(!store.song_exists("s9").unwrap());
    }

    #[test]
    fn test_reimport_replaces() {
        let mut store = store();
        store
            .import_catalog_json(r#"[{"id": "s2", "title": "청춘만화 (Live)", "artist": "이무진"}]"#)
            .unwrap();
        let catalog = store.load_catalog().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[1].title, "청춘만화 (Live)");
    }

    #[test]
    fn test_bad_catalog_json() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(store.import_catalog_json("{\"id\": 1}").is_err());
    }

    #[test]
    fn test_insert_outcomes_per_record() {
        let mut store = store();
        let outcomes = store.insert_clips(&[
            record("s1", 597, Some(848)),
            record("s9", 848, None),        // unknown song
            record("s2", 900, Some(900)),   // empty range
            record("s2", 1000, None),
        ]);
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_err());
        assert!(outcomes[2].is_err());
        assert!(outcomes[3].is_ok());
        assert_eq!(store.clip_count().unwrap(), 2);
    }

    #[test]
    fn test_existing_clips_by_video() {
        let mut store = store();
        let mut other = record("s2", 30, None);
        other.video_url = "https://youtu.be/zyxwvutsrqp".into();
        store.insert_clips(&[record("s1", 597, Some(848)), other]);

        let existing = store.load_existing_clips("abcdefghijk").unwrap();
        assert_eq!(
            existing,
            vec![ExistingClipRef {
                video_id: "abcdefghijk".into(),
                start_seconds: 597
            }]
        );
        assert_eq!(store.load_existing_clips("zyxwvutsrqp").unwrap().len(), 1);
        assert!(store.load_existing_clips("nothing").unwrap().is_empty());
    }

    #[test]
    fn test_opaque_video_target_is_findable() {
        let mut store = store();
        let mut clip = record("s1", 597, None);
        clip.video_url = "abc".into();
        let mut blank = record("s1", 700, None);
        blank.video_url = "  ".into();
        let outcomes = store.insert_clips(&[clip, blank]);
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_err());

        let existing = store.load_existing_clips("abc").unwrap();
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].start_seconds, 597);
    }
}
