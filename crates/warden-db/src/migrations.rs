use rusqlite::Connection;
use tracing::info;

use crate::error::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS guilds (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            owner_id    TEXT NOT NULL,
            icon_url    TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Exactly one settings row per guild, inserted with the guild itself.
        CREATE TABLE IF NOT EXISTS guild_settings (
            guild_id            TEXT PRIMARY KEY
                                REFERENCES guilds(id) ON DELETE CASCADE,
            prefix              TEXT NOT NULL DEFAULT '!',
            locale              TEXT NOT NULL DEFAULT 'en',
            music_volume        INTEGER NOT NULL DEFAULT 100,
            updates_channel_id  TEXT
        );

        -- Per-guild user rows: the same platform user id may exist under
        -- several guilds, each scoped independently.
        CREATE TABLE IF NOT EXISTS guild_users (
            guild_id      TEXT NOT NULL REFERENCES guilds(id) ON DELETE CASCADE,
            user_id       TEXT NOT NULL,
            display_name  TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (guild_id, user_id)
        );

        -- One outstanding record per (issuer, target) pairing; the unique
        -- index is the arbiter when concurrent issuers race.
        CREATE TABLE IF NOT EXISTS warnings (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            guild_id    TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            issuer_id   TEXT NOT NULL,
            reason      TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (guild_id, user_id)
                REFERENCES guild_users(guild_id, user_id) ON DELETE CASCADE,
            UNIQUE (guild_id, user_id, issuer_id)
        );

        CREATE TABLE IF NOT EXISTS kicks (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            guild_id    TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            issuer_id   TEXT NOT NULL,
            reason      TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (guild_id, user_id)
                REFERENCES guild_users(guild_id, user_id) ON DELETE CASCADE,
            UNIQUE (guild_id, user_id, issuer_id)
        );

        -- Child ids are assigned from a guild-scoped sequence (MAX(id)+1
        -- inside the insert transaction), so the first suggestion in every
        -- guild is id 1.
        CREATE TABLE IF NOT EXISTS suggestions (
            guild_id    TEXT NOT NULL REFERENCES guilds(id) ON DELETE CASCADE,
            id          INTEGER NOT NULL,
            content     TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'pending',
            author_id   TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (guild_id, id)
        );

        CREATE TABLE IF NOT EXISTS support_tickets (
            guild_id    TEXT NOT NULL REFERENCES guilds(id) ON DELETE CASCADE,
            id          INTEGER NOT NULL,
            content     TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'open',
            author_id   TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (guild_id, id)
        );

        CREATE TABLE IF NOT EXISTS self_roles (
            guild_id  TEXT NOT NULL REFERENCES guilds(id) ON DELETE CASCADE,
            role_id   TEXT NOT NULL,
            PRIMARY KEY (guild_id, role_id)
        );

        CREATE TABLE IF NOT EXISTS songs (
            guild_id      TEXT NOT NULL REFERENCES guilds(id) ON DELETE CASCADE,
            id            INTEGER NOT NULL,
            title         TEXT NOT NULL,
            url           TEXT NOT NULL,
            requested_by  TEXT NOT NULL,
            position      INTEGER NOT NULL,
            PRIMARY KEY (guild_id, id)
        );

        CREATE INDEX IF NOT EXISTS idx_songs_requester
            ON songs(guild_id, requested_by);

        -- Referral ids are caller-chosen short codes, unique per guild.
        CREATE TABLE IF NOT EXISTS referrals (
            guild_id    TEXT NOT NULL REFERENCES guilds(id) ON DELETE CASCADE,
            id          INTEGER NOT NULL,
            user_id     TEXT NOT NULL,
            invite_url  TEXT NOT NULL,
            join_count  INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL,
            PRIMARY KEY (guild_id, id)
        );

        CREATE TABLE IF NOT EXISTS referral_roles (
            guild_id        TEXT NOT NULL,
            referral_id     INTEGER NOT NULL,
            role_id         TEXT NOT NULL,
            unlock_at_joins INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (guild_id, referral_id),
            FOREIGN KEY (guild_id, referral_id)
                REFERENCES referrals(guild_id, id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS referral_rewards (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            guild_id     TEXT NOT NULL,
            referral_id  INTEGER NOT NULL,
            reward       TEXT NOT NULL,
            unlocked_at  TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (guild_id, referral_id)
                REFERENCES referrals(guild_id, id) ON DELETE CASCADE
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
