//! Row-level query functions.
//!
//! Every function borrows a `Connection` instead of hanging off `Database`,
//! so the engine can compose several of them inside one transaction
//! (a `Transaction` derefs to `Connection`). Callers that need a single
//! statement go through `Database::with_conn` directly.

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::{AccountRow, MatchRow, SwipeRow};

// -- Accounts --

pub fn get_account(conn: &Connection, id: &str) -> Result<Option<AccountRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, tier, daily_count, last_swipe_date, boost_until, created_at
         FROM accounts WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(AccountRow {
                id: row.get(0)?,
                tier: row.get(1)?,
                daily_count: row.get(2)?,
                last_swipe_date: row.get(3)?,
                boost_until: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Provision an account or change its tier. Quota and boost columns are
/// never touched here — tier changes must not clobber an in-flight swipe.
pub fn upsert_account(
    conn: &Connection,
    id: &str,
    tier: &str,
    created_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (id, tier, daily_count, created_at)
         VALUES (?1, ?2, 0, ?3)
         ON CONFLICT(id) DO UPDATE SET tier = excluded.tier",
        params![id, tier, created_at],
    )?;
    Ok(())
}

pub fn upsert_profile(conn: &Connection, user_id: &str, display_name: Option<&str>) -> Result<()> {
    conn.execute(
        "INSERT INTO profiles (user_id, display_name)
         VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE
             SET display_name = COALESCE(excluded.display_name, display_name)",
        params![user_id, display_name],
    )?;
    Ok(())
}

/// Field-level merge of the quota columns only.
pub fn set_quota(
    conn: &Connection,
    id: &str,
    daily_count: i64,
    last_swipe_date: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET daily_count = ?2, last_swipe_date = ?3 WHERE id = ?1",
        params![id, daily_count, last_swipe_date],
    )?;
    Ok(())
}

/// Field-level merge of the boost column only.
pub fn set_boost_until(conn: &Connection, id: &str, until: &str) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET boost_until = ?2 WHERE id = ?1",
        params![id, until],
    )?;
    Ok(())
}

/// Mirror the boost expiry onto the public candidate card so ranking
/// (external) can sort boosted users first.
pub fn mirror_profile_boost(conn: &Connection, user_id: &str, until: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO profiles (user_id, boost_until)
         VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET boost_until = excluded.boost_until",
        params![user_id, until],
    )?;
    Ok(())
}

// -- Swipes --

/// Idempotent by overwrite: a re-swipe replaces direction and timestamp,
/// never duplicates the row.
pub fn upsert_swipe(
    conn: &Connection,
    actor_id: &str,
    target_id: &str,
    direction: &str,
    created_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO swipes (actor_id, target_id, direction, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(actor_id, target_id) DO UPDATE
             SET direction = excluded.direction,
                 created_at = excluded.created_at",
        params![actor_id, target_id, direction, created_at],
    )?;
    Ok(())
}

pub fn get_swipe(conn: &Connection, actor_id: &str, target_id: &str) -> Result<Option<SwipeRow>> {
    let mut stmt = conn.prepare(
        "SELECT actor_id, target_id, direction, created_at
         FROM swipes WHERE actor_id = ?1 AND target_id = ?2",
    )?;

    let row = stmt
        .query_row([actor_id, target_id], |row| {
            Ok(SwipeRow {
                actor_id: row.get(0)?,
                target_id: row.get(1)?,
                direction: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Deletes every swipe where `actor_id` is the acting party. Swipes where
/// they are the target belong to other users and stay.
pub fn delete_swipes_by_actor(conn: &Connection, actor_id: &str) -> Result<usize> {
    let deleted = conn.execute("DELETE FROM swipes WHERE actor_id = ?1", [actor_id])?;
    Ok(deleted)
}

// -- Matches --

/// Conditional create: returns true if this call inserted the row, false
/// if a match with that key already existed. Never overwrites.
pub fn insert_match_if_absent(
    conn: &Connection,
    key: &str,
    user_a: &str,
    user_b: &str,
    created_at: &str,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO matches (key, user_a, user_b, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![key, user_a, user_b, created_at],
    )?;
    Ok(inserted > 0)
}

pub fn get_match(conn: &Connection, key: &str) -> Result<Option<MatchRow>> {
    let mut stmt = conn.prepare(
        "SELECT key, user_a, user_b, created_at, last_message, last_message_at
         FROM matches WHERE key = ?1",
    )?;

    let row = stmt
        .query_row([key], |row| {
            Ok(MatchRow {
                key: row.get(0)?,
                user_a: row.get(1)?,
                user_b: row.get(2)?,
                created_at: row.get(3)?,
                last_message: row.get(4)?,
                last_message_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Newest-first page of a user's matches. `before` is the `created_at`
/// cursor of the previous page's oldest row.
pub fn list_matches_for_user(
    conn: &Connection,
    user_id: &str,
    limit: u32,
    before: Option<&str>,
) -> Result<Vec<MatchRow>> {
    let map_row = |row: &rusqlite::Row<'_>| {
        Ok(MatchRow {
            key: row.get(0)?,
            user_a: row.get(1)?,
            user_b: row.get(2)?,
            created_at: row.get(3)?,
            last_message: row.get(4)?,
            last_message_at: row.get(5)?,
        })
    };

    let rows = if let Some(before) = before {
        let mut stmt = conn.prepare(
            "SELECT key, user_a, user_b, created_at, last_message, last_message_at
             FROM matches
             WHERE ?1 IN (user_a, user_b) AND created_at < ?2
             ORDER BY created_at DESC
             LIMIT ?3",
        )?;
        stmt.query_map(params![user_id, before, limit], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?
    } else {
        let mut stmt = conn.prepare(
            "SELECT key, user_a, user_b, created_at, last_message, last_message_at
             FROM matches
             WHERE ?1 IN (user_a, user_b)
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;
        stmt.query_map(params![user_id, limit], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    Ok(rows)
}

/// Mutates the preview fields of an existing match. Returns the number of
/// rows touched — zero means the key does not exist, and no row is created.
pub fn update_match_preview(
    conn: &Connection,
    key: &str,
    text: &str,
    timestamp: &str,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE matches SET last_message = ?2, last_message_at = ?3 WHERE key = ?1",
        params![key, text, timestamp],
    )?;
    Ok(updated)
}
