use rusqlite::{Connection, OptionalExtension, params};

use warden_types::models::{GuildUser, Kick, Warning};

use crate::error::{StoreError, StoreResult};
use crate::guilds::guild_exists;
use crate::{Database, parse_ts};

impl Database {
    pub fn list_users(&self, guild_id: &str) -> StoreResult<Vec<GuildUser>> {
        self.with_conn(|conn| {
            if !guild_exists(conn, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            query_users(conn, guild_id)
        })
    }

    pub fn get_user(&self, guild_id: &str, user_id: &str) -> StoreResult<GuildUser> {
        self.with_conn(|conn| {
            query_user(conn, guild_id, user_id)?.ok_or(StoreError::NotFound("user"))
        })
    }

    pub fn create_user(
        &self,
        guild_id: &str,
        user_id: &str,
        display_name: &str,
    ) -> StoreResult<GuildUser> {
        if user_id.is_empty() {
            return Err(StoreError::validation("user id must not be empty"));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !guild_exists(&tx, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            tx.execute(
                "INSERT INTO guild_users (guild_id, user_id, display_name) VALUES (?1, ?2, ?3)",
                params![guild_id, user_id, display_name],
            )
            .map_err(StoreError::on_insert("user"))?;

            let user = query_user(&tx, guild_id, user_id)?
                .ok_or(StoreError::Storage("user vanished within transaction".into()))?;
            tx.commit()?;
            Ok(user)
        })
    }

    pub fn update_user(
        &self,
        guild_id: &str,
        user_id: &str,
        display_name: &str,
    ) -> StoreResult<GuildUser> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE guild_users SET display_name = ?3 WHERE guild_id = ?1 AND user_id = ?2",
                params![guild_id, user_id, display_name],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("user"));
            }
            query_user(conn, guild_id, user_id)?.ok_or(StoreError::NotFound("user"))
        })
    }

    /// Removes the user row and, via cascade, their warnings and kicks.
    pub fn delete_user(&self, guild_id: &str, user_id: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM guild_users WHERE guild_id = ?1 AND user_id = ?2",
                params![guild_id, user_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("user"));
            }
            Ok(())
        })
    }

    // -- Moderation --

    pub fn list_warnings(&self, guild_id: &str, user_id: &str) -> StoreResult<Vec<Warning>> {
        self.with_conn(|conn| {
            if query_user(conn, guild_id, user_id)?.is_none() {
                return Err(StoreError::NotFound("user"));
            }
            let mut stmt = conn.prepare(
                "SELECT id, guild_id, user_id, issuer_id, reason, created_at
                 FROM warnings WHERE guild_id = ?1 AND user_id = ?2 ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![guild_id, user_id], row_to_warning)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Both issuer and target must resolve to user rows under the same guild
    /// before the insert; the unique (guild, target, issuer) index rejects a
    /// second outstanding warning from the same issuer.
    pub fn create_warning(
        &self,
        guild_id: &str,
        user_id: &str,
        issuer_id: &str,
        reason: &str,
    ) -> StoreResult<Warning> {
        if reason.is_empty() {
            return Err(StoreError::validation("reason must not be empty"));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if query_user(&tx, guild_id, user_id)?.is_none() {
                return Err(StoreError::NotFound("user"));
            }
            if query_user(&tx, guild_id, issuer_id)?.is_none() {
                return Err(StoreError::NotFound("issuer"));
            }
            tx.execute(
                "INSERT INTO warnings (guild_id, user_id, issuer_id, reason)
                 VALUES (?1, ?2, ?3, ?4)",
                params![guild_id, user_id, issuer_id, reason],
            )
            .map_err(StoreError::on_insert("warning"))?;

            let warning = tx.query_row(
                "SELECT id, guild_id, user_id, issuer_id, reason, created_at
                 FROM warnings WHERE id = ?1",
                [tx.last_insert_rowid()],
                row_to_warning,
            )?;
            tx.commit()?;
            Ok(warning)
        })
    }

    pub fn list_kicks(&self, guild_id: &str, user_id: &str) -> StoreResult<Vec<Kick>> {
        self.with_conn(|conn| {
            if query_user(conn, guild_id, user_id)?.is_none() {
                return Err(StoreError::NotFound("user"));
            }
            let mut stmt = conn.prepare(
                "SELECT id, guild_id, user_id, issuer_id, reason, created_at
                 FROM kicks WHERE guild_id = ?1 AND user_id = ?2 ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![guild_id, user_id], row_to_kick)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn create_kick(
        &self,
        guild_id: &str,
        user_id: &str,
        issuer_id: &str,
        reason: &str,
    ) -> StoreResult<Kick> {
        if reason.is_empty() {
            return Err(StoreError::validation("reason must not be empty"));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if query_user(&tx, guild_id, user_id)?.is_none() {
                return Err(StoreError::NotFound("user"));
            }
            if query_user(&tx, guild_id, issuer_id)?.is_none() {
                return Err(StoreError::NotFound("issuer"));
            }
            tx.execute(
                "INSERT INTO kicks (guild_id, user_id, issuer_id, reason)
                 VALUES (?1, ?2, ?3, ?4)",
                params![guild_id, user_id, issuer_id, reason],
            )
            .map_err(StoreError::on_insert("kick"))?;

            let kick = tx.query_row(
                "SELECT id, guild_id, user_id, issuer_id, reason, created_at
                 FROM kicks WHERE id = ?1",
                [tx.last_insert_rowid()],
                row_to_kick,
            )?;
            tx.commit()?;
            Ok(kick)
        })
    }
}

pub(crate) fn query_users(conn: &Connection, guild_id: &str) -> StoreResult<Vec<GuildUser>> {
    let mut stmt = conn.prepare(
        "SELECT guild_id, user_id, display_name, created_at
         FROM guild_users WHERE guild_id = ?1 ORDER BY created_at",
    )?;
    let rows = stmt
        .query_map([guild_id], row_to_user)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_user(
    conn: &Connection,
    guild_id: &str,
    user_id: &str,
) -> StoreResult<Option<GuildUser>> {
    let row = conn
        .query_row(
            "SELECT guild_id, user_id, display_name, created_at
             FROM guild_users WHERE guild_id = ?1 AND user_id = ?2",
            params![guild_id, user_id],
            row_to_user,
        )
        .optional()?;
    Ok(row)
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<GuildUser> {
    Ok(GuildUser {
        guild_id: row.get(0)?,
        user_id: row.get(1)?,
        display_name: row.get(2)?,
        created_at: parse_ts(&row.get::<_, String>(3)?),
    })
}

fn row_to_warning(row: &rusqlite::Row<'_>) -> rusqlite::Result<Warning> {
    Ok(Warning {
        id: row.get(0)?,
        guild_id: row.get(1)?,
        user_id: row.get(2)?,
        issuer_id: row.get(3)?,
        reason: row.get(4)?,
        created_at: parse_ts(&row.get::<_, String>(5)?),
    })
}

fn row_to_kick(row: &rusqlite::Row<'_>) -> rusqlite::Result<Kick> {
    Ok(Kick {
        id: row.get(0)?,
        guild_id: row.get(1)?,
        user_id: row.get(2)?,
        issuer_id: row.get(3)?,
        reason: row.get(4)?,
        created_at: parse_ts(&row.get::<_, String>(5)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_guild("g1", "Guild One", "owner1", None).unwrap();
        db
    }

    #[test]
    fn same_platform_user_under_two_guilds() {
        let db = db();
        db.create_guild("g2", "Guild Two", "owner2", None).unwrap();

        db.create_user("g1", "u1", "Alice").unwrap();
        db.create_user("g2", "u1", "Alice elsewhere").unwrap();

        assert_eq!(db.get_user("g1", "u1").unwrap().display_name, "Alice");
        assert_eq!(db.get_user("g2", "u1").unwrap().display_name, "Alice elsewhere");
    }

    #[test]
    fn duplicate_user_in_same_guild_conflicts() {
        let db = db();
        db.create_user("g1", "u1", "Alice").unwrap();

        let err = db.create_user("g1", "u1", "Alice again").unwrap_err();
        assert!(matches!(err, StoreError::Conflict("user")));
    }

    #[test]
    fn user_under_missing_guild_is_not_found() {
        let db = db();
        let err = db.create_user("missing", "u1", "Alice").unwrap_err();
        assert!(matches!(err, StoreError::NotFound("guild")));
    }

    #[test]
    fn warning_requires_issuer_and_target_in_same_guild() {
        let db = db();
        db.create_guild("g2", "Guild Two", "owner2", None).unwrap();
        db.create_user("g1", "u1", "Alice").unwrap();
        db.create_user("g2", "mod", "Mod of g2").unwrap();

        // Issuer exists, but under a different guild.
        let err = db.create_warning("g1", "u1", "mod", "spam").unwrap_err();
        assert!(matches!(err, StoreError::NotFound("issuer")));

        // Nonexistent target.
        db.create_user("g1", "mod", "Mod of g1").unwrap();
        let err = db.create_warning("g1", "ghost", "mod", "spam").unwrap_err();
        assert!(matches!(err, StoreError::NotFound("user")));
    }

    #[test]
    fn one_outstanding_warning_per_issuer_target_pair() {
        let db = db();
        db.create_user("g1", "u1", "Alice").unwrap();
        db.create_user("g1", "mod", "Mod").unwrap();

        db.create_warning("g1", "u1", "mod", "spam").unwrap();
        let err = db.create_warning("g1", "u1", "mod", "spam again").unwrap_err();
        assert!(matches!(err, StoreError::Conflict("warning")));
        assert_eq!(db.list_warnings("g1", "u1").unwrap().len(), 1);
    }

    #[test]
    fn deleting_user_removes_their_moderation_records() {
        let db = db();
        db.create_user("g1", "u1", "Alice").unwrap();
        db.create_user("g1", "mod", "Mod").unwrap();
        db.create_warning("g1", "u1", "mod", "spam").unwrap();
        db.create_kick("g1", "u1", "mod", "kept spamming").unwrap();

        db.delete_user("g1", "u1").unwrap();

        let warnings: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM warnings WHERE guild_id = 'g1' AND user_id = 'u1'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(warnings, 0);

        let err = db.list_kicks("g1", "u1").unwrap_err();
        assert!(matches!(err, StoreError::NotFound("user")));
    }
}
