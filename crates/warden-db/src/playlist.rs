use rusqlite::{Connection, OptionalExtension, params};

use warden_types::models::Song;

use crate::error::{StoreError, StoreResult};
use crate::guilds::guild_exists;
use crate::Database;

impl Database {
    /// Songs in playback order.
    pub fn list_songs(&self, guild_id: &str) -> StoreResult<Vec<Song>> {
        self.with_conn(|conn| {
            if !guild_exists(conn, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            query_songs(conn, guild_id)
        })
    }

    /// Appends at the tail of the queue: insertion order defines playback order.
    pub fn enqueue_song(
        &self,
        guild_id: &str,
        title: &str,
        url: &str,
        requested_by: &str,
    ) -> StoreResult<Song> {
        if title.is_empty() {
            return Err(StoreError::validation("title must not be empty"));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(StoreError::validation("url must be http(s)"));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !guild_exists(&tx, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            let (next_id, next_pos): (i64, i64) = tx.query_row(
                "SELECT COALESCE(MAX(id), 0) + 1, COALESCE(MAX(position), 0) + 1
                 FROM songs WHERE guild_id = ?1",
                [guild_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            tx.execute(
                "INSERT INTO songs (guild_id, id, title, url, requested_by, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![guild_id, next_id, title, url, requested_by, next_pos],
            )
            .map_err(StoreError::on_insert("song"))?;

            let song = query_song(&tx, guild_id, next_id)?
                .ok_or(StoreError::Storage("song vanished within transaction".into()))?;
            tx.commit()?;
            Ok(song)
        })
    }

    pub fn delete_song(&self, guild_id: &str, id: i64) -> StoreResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM songs WHERE guild_id = ?1 AND id = ?2",
                params![guild_id, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("song"));
            }
            Ok(())
        })
    }

    /// Removes every song the user requested in this guild in one statement,
    /// so the purge is all-or-none. Returns the number of removed songs.
    pub fn delete_songs_by_requester(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> StoreResult<usize> {
        self.with_conn(|conn| {
            if !guild_exists(conn, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            let removed = conn.execute(
                "DELETE FROM songs WHERE guild_id = ?1 AND requested_by = ?2",
                params![guild_id, user_id],
            )?;
            Ok(removed)
        })
    }

    pub fn clear_playlist(&self, guild_id: &str) -> StoreResult<usize> {
        self.with_conn(|conn| {
            if !guild_exists(conn, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            let removed = conn.execute("DELETE FROM songs WHERE guild_id = ?1", [guild_id])?;
            Ok(removed)
        })
    }
}

pub(crate) fn query_songs(conn: &Connection, guild_id: &str) -> StoreResult<Vec<Song>> {
    let mut stmt = conn.prepare(
        "SELECT guild_id, id, title, url, requested_by, position
         FROM songs WHERE guild_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map([guild_id], row_to_song)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_song(conn: &Connection, guild_id: &str, id: i64) -> StoreResult<Option<Song>> {
    let row = conn
        .query_row(
            "SELECT guild_id, id, title, url, requested_by, position
             FROM songs WHERE guild_id = ?1 AND id = ?2",
            params![guild_id, id],
            row_to_song,
        )
        .optional()?;
    Ok(row)
}

fn row_to_song(row: &rusqlite::Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        guild_id: row.get(0)?,
        id: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        requested_by: row.get(4)?,
        position: row.get(5)?,
    })
}
