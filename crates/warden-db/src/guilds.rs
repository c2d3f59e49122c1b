use rusqlite::{Connection, OptionalExtension, params};

use warden_types::models::{Guild, GuildGraph, GuildSettings};

use crate::error::{StoreError, StoreResult};
use crate::{Database, parse_ts};

impl Database {
    /// Listing projection: guilds without their child collections.
    pub fn list_guilds(&self) -> StoreResult<Vec<Guild>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, owner_id, icon_url, created_at FROM guilds ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([], row_to_guild)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Full guild graph, or `None` when the guild does not exist. Absence is
    /// a value here, not an error; the controller maps it to 404.
    pub fn get_guild(&self, id: &str) -> StoreResult<Option<GuildGraph>> {
        self.with_conn(|conn| {
            let Some(guild) = query_guild(conn, id)? else {
                return Ok(None);
            };
            let settings = query_settings(conn, id)?
                .ok_or(StoreError::Storage("guild has no settings row".into()))?;

            Ok(Some(GuildGraph {
                guild,
                settings,
                users: crate::users::query_users(conn, id)?,
                suggestions: crate::suggestions::query_suggestions(conn, id)?,
                support_tickets: crate::tickets::query_tickets(conn, id)?,
                self_assignable_roles: crate::roles::query_self_roles(conn, id)?,
                playlist: crate::playlist::query_songs(conn, id)?,
                referrals: crate::referrals::query_referrals(conn, id)?,
            }))
        })
    }

    /// Inserts a new guild together with its default settings row.
    pub fn create_guild(
        &self,
        id: &str,
        name: &str,
        owner_id: &str,
        icon_url: Option<&str>,
    ) -> StoreResult<Guild> {
        if id.is_empty() {
            return Err(StoreError::validation("guild id must not be empty"));
        }
        if name.is_empty() {
            return Err(StoreError::validation("guild name must not be empty"));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO guilds (id, name, owner_id, icon_url) VALUES (?1, ?2, ?3, ?4)",
                params![id, name, owner_id, icon_url],
            )
            .map_err(StoreError::on_insert("guild"))?;
            tx.execute("INSERT INTO guild_settings (guild_id) VALUES (?1)", [id])?;

            let guild = query_guild(&tx, id)?
                .ok_or(StoreError::Storage("guild vanished within transaction".into()))?;
            tx.commit()?;
            Ok(guild)
        })
    }

    /// Full-replace semantics on the mutable fields; the id is immutable.
    pub fn update_guild(
        &self,
        id: &str,
        name: &str,
        owner_id: &str,
        icon_url: Option<&str>,
    ) -> StoreResult<Guild> {
        if name.is_empty() {
            return Err(StoreError::validation("guild name must not be empty"));
        }

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE guilds SET name = ?2, owner_id = ?3, icon_url = ?4 WHERE id = ?1",
                params![id, name, owner_id, icon_url],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("guild"));
            }
            query_guild(conn, id)?.ok_or(StoreError::NotFound("guild"))
        })
    }

    /// Cascades to every child collection. Repeated deletes after the first
    /// successful one report not-found, not success.
    pub fn delete_guild(&self, id: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM guilds WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(StoreError::NotFound("guild"));
            }
            Ok(())
        })
    }

    // -- Settings --

    pub fn get_settings(&self, guild_id: &str) -> StoreResult<GuildSettings> {
        self.with_conn(|conn| {
            query_settings(conn, guild_id)?.ok_or(StoreError::NotFound("guild"))
        })
    }

    pub fn update_settings(
        &self,
        guild_id: &str,
        prefix: &str,
        locale: &str,
        music_volume: u32,
        updates_channel_id: Option<&str>,
    ) -> StoreResult<GuildSettings> {
        if prefix.is_empty() || prefix.len() > 16 {
            return Err(StoreError::validation("prefix must be 1-16 characters"));
        }
        if locale.is_empty() {
            return Err(StoreError::validation("locale must not be empty"));
        }
        if music_volume > 200 {
            return Err(StoreError::validation("music_volume must be 0-200"));
        }

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE guild_settings
                 SET prefix = ?2, locale = ?3, music_volume = ?4, updates_channel_id = ?5
                 WHERE guild_id = ?1",
                params![guild_id, prefix, locale, music_volume, updates_channel_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("guild"));
            }
            query_settings(conn, guild_id)?.ok_or(StoreError::NotFound("guild"))
        })
    }
}

pub(crate) fn guild_exists(conn: &Connection, id: &str) -> StoreResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM guilds WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn query_guild(conn: &Connection, id: &str) -> StoreResult<Option<Guild>> {
    let row = conn
        .query_row(
            "SELECT id, name, owner_id, icon_url, created_at FROM guilds WHERE id = ?1",
            [id],
            row_to_guild,
        )
        .optional()?;
    Ok(row)
}

fn query_settings(conn: &Connection, guild_id: &str) -> StoreResult<Option<GuildSettings>> {
    let row = conn
        .query_row(
            "SELECT guild_id, prefix, locale, music_volume, updates_channel_id
             FROM guild_settings WHERE guild_id = ?1",
            [guild_id],
            |row| {
                Ok(GuildSettings {
                    guild_id: row.get(0)?,
                    prefix: row.get(1)?,
                    locale: row.get(2)?,
                    music_volume: row.get(3)?,
                    updates_channel_id: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

fn row_to_guild(row: &rusqlite::Row<'_>) -> rusqlite::Result<Guild> {
    Ok(Guild {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        icon_url: row.get(3)?,
        created_at: parse_ts(&row.get::<_, String>(4)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn create_then_get_roundtrip() {
        let db = db();
        assert!(db.get_guild("g1").unwrap().is_none());

        let created = db.create_guild("g1", "Guild One", "owner1", None).unwrap();
        let graph = db.get_guild("g1").unwrap().unwrap();

        assert_eq!(graph.guild, created);
        assert_eq!(graph.settings.prefix, "!");
        assert_eq!(graph.settings.music_volume, 100);
        assert!(graph.users.is_empty());
        assert!(graph.playlist.is_empty());
    }

    #[test]
    fn duplicate_guild_id_conflicts() {
        let db = db();
        db.create_guild("g1", "Guild One", "owner1", None).unwrap();

        let err = db.create_guild("g1", "Again", "owner2", None).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(db.list_guilds().unwrap().len(), 1);
    }

    #[test]
    fn update_absent_guild_is_not_found() {
        let db = db();
        let err = db.update_guild("nope", "Name", "owner", None).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("guild")));
    }

    #[test]
    fn update_replaces_mutable_fields() {
        let db = db();
        db.create_guild("g1", "Old", "owner1", None).unwrap();

        let updated = db
            .update_guild("g1", "New", "owner2", Some("https://cdn.example/icon.png"))
            .unwrap();
        assert_eq!(updated.name, "New");
        assert_eq!(updated.owner_id, "owner2");
        assert_eq!(updated.icon_url.as_deref(), Some("https://cdn.example/icon.png"));
    }

    #[test]
    fn repeated_delete_reports_not_found() {
        let db = db();
        db.create_guild("g1", "Guild One", "owner1", None).unwrap();

        db.delete_guild("g1").unwrap();
        let err = db.delete_guild("g1").unwrap_err();
        assert!(matches!(err, StoreError::NotFound("guild")));
    }

    #[test]
    fn delete_cascades_to_all_children() {
        let db = db();
        db.create_guild("g1", "Guild One", "owner1", None).unwrap();
        db.create_user("g1", "u1", "Alice").unwrap();
        db.create_user("g1", "u2", "Bob").unwrap();
        db.create_warning("g1", "u2", "u1", "spam").unwrap();
        db.create_kick("g1", "u2", "u1", "repeat spam").unwrap();
        db.create_suggestion("g1", "add polls", "u1").unwrap();
        db.create_ticket("g1", "cannot hear bot", "u2").unwrap();
        db.create_self_role("g1", "r1").unwrap();
        db.enqueue_song("g1", "Song A", "https://tube.example/a", "u1").unwrap();
        db.create_referral("g1", 42, "u1", "https://chat.example/inv", Some("vip"), Some(3), None)
            .unwrap();
        db.unlock_referral_reward("g1", 42, "custom emoji").unwrap();

        db.delete_guild("g1").unwrap();

        // No orphaned child rows may remain in any table.
        for table in [
            "guild_settings",
            "guild_users",
            "warnings",
            "kicks",
            "suggestions",
            "support_tickets",
            "self_roles",
            "songs",
            "referrals",
            "referral_roles",
            "referral_rewards",
        ] {
            let count: i64 = db
                .with_conn(|conn| {
                    Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                        row.get(0)
                    })?)
                })
                .unwrap();
            assert_eq!(count, 0, "orphaned rows left in {table}");
        }
    }

    #[test]
    fn settings_update_validates_fields() {
        let db = db();
        db.create_guild("g1", "Guild One", "owner1", None).unwrap();

        let err = db.update_settings("g1", "", "en", 100, None).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = db.update_settings("g1", "!", "en", 500, None).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let updated = db
            .update_settings("g1", "?", "de", 80, Some("chan-9"))
            .unwrap();
        assert_eq!(updated.prefix, "?");
        assert_eq!(updated.locale, "de");
        assert_eq!(updated.music_volume, 80);
        assert_eq!(updated.updates_channel_id.as_deref(), Some("chan-9"));
    }
}
