use rusqlite::{Connection, OptionalExtension, params};

use warden_types::models::{SupportTicket, TicketStatus};

use crate::error::{StoreError, StoreResult};
use crate::guilds::guild_exists;
use crate::{Database, parse_ts};

impl Database {
    pub fn list_tickets(&self, guild_id: &str) -> StoreResult<Vec<SupportTicket>> {
        self.with_conn(|conn| {
            if !guild_exists(conn, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            query_tickets(conn, guild_id)
        })
    }

    pub fn create_ticket(
        &self,
        guild_id: &str,
        content: &str,
        author_id: &str,
    ) -> StoreResult<SupportTicket> {
        if content.is_empty() {
            return Err(StoreError::validation("content must not be empty"));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !guild_exists(&tx, guild_id)? {
                return Err(StoreError::NotFound("guild"));
            }
            let next_id: i64 = tx.query_row(
                "SELECT COALESCE(MAX(id), 0) + 1 FROM support_tickets WHERE guild_id = ?1",
                [guild_id],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO support_tickets (guild_id, id, content, author_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![guild_id, next_id, content, author_id],
            )
            .map_err(StoreError::on_insert("support ticket"))?;

            let ticket = query_ticket(&tx, guild_id, next_id)?
                .ok_or(StoreError::Storage("ticket vanished within transaction".into()))?;
            tx.commit()?;
            Ok(ticket)
        })
    }

    pub fn update_ticket(
        &self,
        guild_id: &str,
        id: i64,
        content: Option<&str>,
        status: Option<&str>,
    ) -> StoreResult<SupportTicket> {
        let status = status
            .map(|s| {
                TicketStatus::parse(s)
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
            let existing =
                query_ticket(&tx, guild_id, id)?.ok_or(StoreError::NotFound("support ticket"))?;

            let content = content.unwrap_or(&existing.content);
            let status = status.unwrap_or(existing.status);
            tx.execute(
                "UPDATE support_tickets SET content = ?3, status = ?4
                 WHERE guild_id = ?1 AND id = ?2",
                params![guild_id, id, content, status.as_str()],
            )?;

            let updated =
                query_ticket(&tx, guild_id, id)?.ok_or(StoreError::NotFound("support ticket"))?;
            tx.commit()?;
            Ok(updated)
        })
    }

    pub fn delete_ticket(&self, guild_id: &str, id: i64) -> StoreResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM support_tickets WHERE guild_id = ?1 AND id = ?2",
                params![guild_id, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("support ticket"));
            }
            Ok(())
        })
    }
}

pub(crate) fn query_tickets(conn: &Connection, guild_id: &str) -> StoreResult<Vec<SupportTicket>> {
    let mut stmt = conn.prepare(
        "SELECT guild_id, id, content, status, author_id, created_at
         FROM support_tickets WHERE guild_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([guild_id], row_to_ticket)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_ticket(
    conn: &Connection,
    guild_id: &str,
    id: i64,
) -> StoreResult<Option<SupportTicket>> {
    let row = conn
        .query_row(
            "SELECT guild_id, id, content, status, author_id, created_at
             FROM support_tickets WHERE guild_id = ?1 AND id = ?2",
            params![guild_id, id],
            row_to_ticket,
        )
        .optional()?;
    Ok(row)
}

fn row_to_ticket(row: &rusqlite::Row<'_>) -> rusqlite::Result<SupportTicket> {
    let status: String = row.get(3)?;
    Ok(SupportTicket {
        guild_id: row.get(0)?,
        id: row.get(1)?,
        content: row.get(2)?,
        status: TicketStatus::parse(&status).unwrap_or(TicketStatus::Open),
        author_id: row.get(4)?,
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
    fn ticket_lifecycle_open_to_closed() {
        let db = db();

        let created = db.create_ticket("g1", "cannot hear bot", "u1").unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.status, TicketStatus::Open);

        let closed = db.update_ticket("g1", 1, None, Some("closed")).unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);

        db.delete_ticket("g1", 1).unwrap();
        assert!(db.list_tickets("g1").unwrap().is_empty());
    }

    #[test]
    fn suggestion_status_is_not_a_ticket_status() {
        let db = db();
        db.create_ticket("g1", "no sound", "u1").unwrap();

        let err = db.update_ticket("g1", 1, None, Some("approved")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
