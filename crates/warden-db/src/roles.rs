use rusqlite::{Connection, OptionalExtension, params};

use warden_types::models::SelfAssignableRole;

use crate::error::{StoreError, StoreResult};
use crate::guilds::guild_exists;
use crate::Database;

impl Database {
    pub fn list_self_roles(&self, guild_id: &str) -> StoreResult<Vec<SelfAssignableRole>> {
        self.with_conn(|conn| {
            if !guild_exists(conn, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            query_self_roles(conn, guild_id)
        })
    }

    /// Lookup-then-insert in a single transaction. The lookup gives the clean
    /// 409 on the common path; the (guild_id, role_id) primary key is the
    /// final arbiter if two creators race, and its violation is reported as
    /// the same conflict.
    pub fn create_self_role(
        &self,
        guild_id: &str,
        role_id: &str,
    ) -> StoreResult<SelfAssignableRole> {
        if role_id.is_empty() {
            return Err(StoreError::validation("role id must not be empty"));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !guild_exists(&tx, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }

            let existing: Option<String> = tx
                .query_row(
                    "SELECT role_id FROM self_roles WHERE guild_id = ?1 AND role_id = ?2",
                    params![guild_id, role_id],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::Conflict("self-assignable role"));
            }

            tx.execute(
                "INSERT INTO self_roles (guild_id, role_id) VALUES (?1, ?2)",
                params![guild_id, role_id],
            )
            .map_err(StoreError::on_insert("self-assignable role"))?;
            tx.commit()?;

            Ok(SelfAssignableRole {
                guild_id: guild_id.to_string(),
                role_id: role_id.to_string(),
            })
        })
    }

    pub fn delete_self_role(&self, guild_id: &str, role_id: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM self_roles WHERE guild_id = ?1 AND role_id = ?2",
                params![guild_id, role_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("self-assignable role"));
            }
            Ok(())
        })
    }
}

pub(crate) fn query_self_roles(
    conn: &Connection,
    guild_id: &str,
) -> StoreResult<Vec<SelfAssignableRole>> {
    let mut stmt =
        conn.prepare("SELECT guild_id, role_id FROM self_roles WHERE guild_id = ?1 ORDER BY role_id")?;
    let rows = stmt
        .query_map([guild_id], |row| {
            Ok(SelfAssignableRole {
                guild_id: row.get(0)?,
                role_id: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
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
    fn duplicate_creation_is_rejected_with_one_row_stored() {
        let db = db();

        db.create_self_role("g1", "r1").unwrap();
        let err = db.create_self_role("g1", "r1").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let roles = db.list_self_roles("g1").unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].role_id, "r1");
    }

    #[test]
    fn same_role_under_another_guild_is_fine() {
        let db = db();
        db.create_guild("g2", "Guild Two", "owner2", None).unwrap();

        db.create_self_role("g1", "r1").unwrap();
        db.create_self_role("g2", "r1").unwrap();

        assert_eq!(db.list_self_roles("g1").unwrap().len(), 1);
        assert_eq!(db.list_self_roles("g2").unwrap().len(), 1);
    }

    #[test]
    fn delete_absent_role_is_not_found() {
        let db = db();
        let err = db.delete_self_role("g1", "r1").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
