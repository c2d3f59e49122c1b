use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use warden_types::models::{Referral, ReferralReward, ReferralRole};

use crate::error::{StoreError, StoreResult};
use crate::guilds::guild_exists;
use crate::{Database, parse_ts};

impl Database {
    pub fn list_referrals(&self, guild_id: &str) -> StoreResult<Vec<Referral>> {
        self.with_conn(|conn| {
            if !guild_exists(conn, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            query_referrals(conn, guild_id)
        })
    }

    pub fn get_referral(&self, guild_id: &str, id: i64) -> StoreResult<Referral> {
        self.with_conn(|conn| {
            query_referral(conn, guild_id, id)?.ok_or(StoreError::NotFound("referral"))
        })
    }

    /// The id is caller-chosen (it is the short code members type), so the
    /// service validates it and the per-guild primary key arbitrates
    /// duplicates. Stamps a creation timestamp when none is supplied.
    pub fn create_referral(
        &self,
        guild_id: &str,
        id: i64,
        user_id: &str,
        invite_url: &str,
        role_id: Option<&str>,
        unlock_at_joins: Option<i64>,
        created_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Referral> {
        if id <= 0 || id > 999_999 {
            return Err(StoreError::validation("referral id must be a short positive number"));
        }
        validate_invite_url(invite_url)?;

        let created_at = created_at.unwrap_or_else(Utc::now);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !guild_exists(&tx, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            tx.execute(
                "INSERT INTO referrals (guild_id, id, user_id, invite_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![guild_id, id, user_id, invite_url, created_at.to_rfc3339()],
            )
            .map_err(StoreError::on_insert("referral"))?;

            if let Some(role_id) = role_id {
                tx.execute(
                    "INSERT INTO referral_roles (guild_id, referral_id, role_id, unlock_at_joins)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![guild_id, id, role_id, unlock_at_joins.unwrap_or(0)],
                )?;
            }

            let referral = query_referral(&tx, guild_id, id)?
                .ok_or(StoreError::Storage("referral vanished within transaction".into()))?;
            tx.commit()?;
            Ok(referral)
        })
    }

    pub fn update_referral(
        &self,
        guild_id: &str,
        id: i64,
        invite_url: &str,
    ) -> StoreResult<Referral> {
        validate_invite_url(invite_url)?;

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE referrals SET invite_url = ?3 WHERE guild_id = ?1 AND id = ?2",
                params![guild_id, id, invite_url],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("referral"));
            }
            query_referral(conn, guild_id, id)?.ok_or(StoreError::NotFound("referral"))
        })
    }

    /// A member joined through this invite.
    pub fn record_referral_join(&self, guild_id: &str, id: i64) -> StoreResult<Referral> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE referrals SET join_count = join_count + 1
                 WHERE guild_id = ?1 AND id = ?2",
                params![guild_id, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("referral"));
            }
            query_referral(conn, guild_id, id)?.ok_or(StoreError::NotFound("referral"))
        })
    }

    pub fn unlock_referral_reward(
        &self,
        guild_id: &str,
        id: i64,
        reward: &str,
    ) -> StoreResult<Referral> {
        if reward.is_empty() {
            return Err(StoreError::validation("reward must not be empty"));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if query_referral(&tx, guild_id, id)?.is_none() {
                return Err(StoreError::NotFound("referral"));
            }
            tx.execute(
                "INSERT INTO referral_rewards (guild_id, referral_id, reward)
                 VALUES (?1, ?2, ?3)",
                params![guild_id, id, reward],
            )?;
            let referral = query_referral(&tx, guild_id, id)?
                .ok_or(StoreError::NotFound("referral"))?;
            tx.commit()?;
            Ok(referral)
        })
    }

    pub fn delete_referral(&self, guild_id: &str, id: i64) -> StoreResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM referrals WHERE guild_id = ?1 AND id = ?2",
                params![guild_id, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("referral"));
            }
            Ok(())
        })
    }
}

fn validate_invite_url(url: &str) -> StoreResult<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(StoreError::validation("invite_url must be http(s)"));
    }
    Ok(())
}

pub(crate) fn query_referrals(conn: &Connection, guild_id: &str) -> StoreResult<Vec<Referral>> {
    let mut stmt = conn.prepare(
        "SELECT guild_id, id, user_id, invite_url, join_count, created_at
         FROM referrals WHERE guild_id = ?1 ORDER BY id",
    )?;
    let bare = stmt
        .query_map([guild_id], row_to_referral)?
        .collect::<Result<Vec<_>, _>>()?;

    bare.into_iter()
        .map(|r| attach_children(conn, r))
        .collect()
}

fn query_referral(conn: &Connection, guild_id: &str, id: i64) -> StoreResult<Option<Referral>> {
    let row = conn
        .query_row(
            "SELECT guild_id, id, user_id, invite_url, join_count, created_at
             FROM referrals WHERE guild_id = ?1 AND id = ?2",
            params![guild_id, id],
            row_to_referral,
        )
        .optional()?;
    match row {
        Some(r) => Ok(Some(attach_children(conn, r)?)),
        None => Ok(None),
    }
}

fn attach_children(conn: &Connection, mut referral: Referral) -> StoreResult<Referral> {
    referral.role = conn
        .query_row(
            "SELECT role_id, unlock_at_joins FROM referral_roles
             WHERE guild_id = ?1 AND referral_id = ?2",
            params![referral.guild_id, referral.id],
            |row| {
                Ok(ReferralRole {
                    role_id: row.get(0)?,
                    unlock_at_joins: row.get(1)?,
                })
            },
        )
        .optional()?;

    let mut stmt = conn.prepare(
        "SELECT id, reward, unlocked_at FROM referral_rewards
         WHERE guild_id = ?1 AND referral_id = ?2 ORDER BY id",
    )?;
    referral.rewards = stmt
        .query_map(params![referral.guild_id, referral.id], |row| {
            Ok(ReferralReward {
                id: row.get(0)?,
                reward: row.get(1)?,
                unlocked_at: parse_ts(&row.get::<_, String>(2)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(referral)
}

fn row_to_referral(row: &rusqlite::Row<'_>) -> rusqlite::Result<Referral> {
    Ok(Referral {
        guild_id: row.get(0)?,
        id: row.get(1)?,
        user_id: row.get(2)?,
        invite_url: row.get(3)?,
        join_count: row.get(4)?,
        created_at: parse_ts(&row.get::<_, String>(5)?),
        role: None,
        rewards: Vec::new(),
    })
}
