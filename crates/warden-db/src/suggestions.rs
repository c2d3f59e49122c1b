use rusqlite::{Connection, OptionalExtension, params};

use warden_types::models::{Suggestion, SuggestionStatus};

use crate::error::{StoreError, StoreResult};
use crate::guilds::guild_exists;
use crate::{Database, parse_ts};

impl Database {
    pub fn list_suggestions(&self, guild_id: &str) -> StoreResult<Vec<Suggestion>> {
        self.with_conn(|conn| {
            if !guild_exists(conn, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            query_suggestions(conn, guild_id)
        })
    }

    /// Assigns the id from the guild-scoped sequence inside the same
    /// transaction as the insert, so concurrent creators cannot collide.
    pub fn create_suggestion(
        &self,
        guild_id: &str,
        content: &str,
        author_id: &str,
    ) -> StoreResult<Suggestion> {
        if content.is_empty() {
            return Err(StoreError::validation("content must not be empty"));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !guild_exists(&tx, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            let next_id: i64 = tx.query_row(
                "SELECT COALESCE(MAX(id), 0) + 1 FROM suggestions WHERE guild_id = ?1",
                [guild_id],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO suggestions (guild_id, id, content, author_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![guild_id, next_id, content, author_id],
            )
            .map_err(StoreError::on_insert("suggestion"))?;

            let suggestion = query_suggestion(&tx, guild_id, next_id)?
                .ok_or(StoreError::Storage("suggestion vanished within transaction".into()))?;
            tx.commit()?;
            Ok(suggestion)
        })
    }

    pub fn update_suggestion(
        &self,
        guild_id: &str,
        id: i64,
        content: Option<&str>,
        status: Option<&str>,
    ) -> StoreResult<Suggestion> {
        let status = status
            .map(|s| {
                SuggestionStatus::parse(s)
                    .ok_or_else(|| StoreError::validation(format!("unknown status '{s}'")))
            })
            .transpose()?;
        if let Some(content) = content
            && content.is_empty()
        {
            return Err(StoreError::validation("content must not be empty"));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let existing = query_suggestion(&tx, guild_id, id)?
                .ok_or(StoreError::NotFound("suggestion"))?;

            let content = content.unwrap_or(&existing.content);
            let status = status.unwrap_or(existing.status);
            tx.execute(
                "UPDATE suggestions SET content = ?3, status = ?4
                 WHERE guild_id = ?1 AND id = ?2",
                params![guild_id, id, content, status.as_str()],
            )?;

            let updated = query_suggestion(&tx, guild_id, id)?
                .ok_or(StoreError::NotFound("suggestion"))?;
            tx.commit()?;
            Ok(updated)
        })
    }

    pub fn delete_suggestion(&self, guild_id: &str, id: i64) -> StoreResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM suggestions WHERE guild_id = ?1 AND id = ?2",
                params![guild_id, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("suggestion"));
            }
            Ok(())
        })
    }
}

pub(crate) fn query_suggestions(
    conn: &Connection,
    guild_id: &str,
) -> StoreResult<Vec<Suggestion>> {
    let mut stmt = conn.prepare(
        "SELECT guild_id, id, content, status, author_id, created_at
         FROM suggestions WHERE guild_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([guild_id], row_to_suggestion)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_suggestion(
    conn: &Connection,
    guild_id: &str,
    id: i64,
) -> StoreResult<Option<Suggestion>> {
    let row = conn
        .query_row(
            "SELECT guild_id, id, content, status, author_id, created_at
             FROM suggestions WHERE guild_id = ?1 AND id = ?2",
            params![guild_id, id],
            row_to_suggestion,
        )
        .optional()?;
    Ok(row)
}

fn row_to_suggestion(row: &rusqlite::Row<'_>) -> rusqlite::Result<Suggestion> {
    let status: String = row.get(3)?;
    Ok(Suggestion {
        guild_id: row.get(0)?,
        id: row.get(1)?,
        content: row.get(2)?,
        // Unknown strings cannot appear through the service; default defensively.
        status: SuggestionStatus::parse(&status).unwrap_or(SuggestionStatus::Pending),
        author_id: row.get(4)?,
        created_at: parse_ts(&row.get::<_, String>(5)?),
    })
}
