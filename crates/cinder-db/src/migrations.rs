use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS accounts (
            id              TEXT PRIMARY KEY,
            tier            TEXT NOT NULL,
            daily_count     INTEGER NOT NULL DEFAULT 0,
            last_swipe_date TEXT,
            boost_until     TEXT,
            created_at      TEXT NOT NULL
        );

        -- One row per ordered (actor, target) pair; re-swiping overwrites.
        CREATE TABLE IF NOT EXISTS swipes (
            actor_id    TEXT NOT NULL REFERENCES accounts(id),
            target_id   TEXT NOT NULL REFERENCES accounts(id),
            direction   TEXT NOT NULL CHECK (direction IN ('like', 'pass')),
            created_at  TEXT NOT NULL,
            PRIMARY KEY (actor_id, target_id)
        );

        CREATE INDEX IF NOT EXISTS idx_swipes_target
            ON swipes(target_id, actor_id);

        -- key = both member ids sorted ascending, joined with ':';
        -- user_a < user_b always holds.
        CREATE TABLE IF NOT EXISTS matches (
            key             TEXT PRIMARY KEY,
            user_a          TEXT NOT NULL REFERENCES accounts(id),
            user_b          TEXT NOT NULL REFERENCES accounts(id),
            created_at      TEXT NOT NULL,
            last_message    TEXT,
            last_message_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_matches_user_a
            ON matches(user_a, created_at);
        CREATE INDEX IF NOT EXISTS idx_matches_user_b
            ON matches(user_b, created_at);

        -- Public-facing candidate card. Owned by the account-management
        -- collaborator; the engine only mirrors boost_until into it.
        CREATE TABLE IF NOT EXISTS profiles (
            user_id      TEXT PRIMARY KEY REFERENCES accounts(id),
            display_name TEXT,
            boost_until  TEXT
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
