use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE sources (
                id                      INTEGER PRIMARY KEY,
                uuid                    TEXT NOT NULL UNIQUE,
                journalist_designation  TEXT NOT NULL,
                is_flagged              INTEGER NOT NULL DEFAULT 0,
                public_key              TEXT,
                interaction_count       INTEGER NOT NULL DEFAULT 0,
                is_starred              INTEGER NOT NULL DEFAULT 0,
                last_updated            TEXT
            );

            CREATE TABLE users (
                id          INTEGER PRIMARY KEY,
                uuid        TEXT NOT NULL UNIQUE,
                username    TEXT NOT NULL,
                firstname   TEXT,
                lastname    TEXT
            );

            CREATE TABLE submissions (
                id              INTEGER PRIMARY KEY,
                uuid            TEXT NOT NULL UNIQUE,
                kind            TEXT NOT NULL CHECK (kind IN ('file', 'message')),
                source_id       INTEGER REFERENCES sources(id),
                file_counter    INTEGER NOT NULL,
                filename        TEXT NOT NULL,
                size            INTEGER NOT NULL,
                download_url    TEXT NOT NULL,
                is_downloaded   INTEGER,
                is_decrypted    INTEGER,
                is_read         INTEGER NOT NULL DEFAULT 0,
                content         TEXT,
                CHECK (kind = 'file' OR is_decrypted IS NOT 1 OR coalesce(content, '') <> '')
            );

            CREATE INDEX idx_submissions_source ON submissions(source_id, file_counter);

            CREATE TABLE replies (
                id              INTEGER PRIMARY KEY,
                uuid            TEXT NOT NULL UNIQUE,
                source_id       INTEGER REFERENCES sources(id),
                journalist_id   INTEGER REFERENCES users(id),
                file_counter    INTEGER NOT NULL,
                filename        TEXT NOT NULL,
                size            INTEGER NOT NULL,
                is_downloaded   INTEGER,
                is_decrypted    INTEGER,
                content         TEXT,
                CHECK (is_decrypted IS NOT 1 OR coalesce(content, '') <> '')
            );

            CREATE INDEX idx_replies_source ON replies(source_id, file_counter);

            CREATE TABLE draft_replies (
                id              INTEGER PRIMARY KEY,
                uuid            TEXT NOT NULL UNIQUE,
                source_id       INTEGER REFERENCES sources(id),
                journalist_id   INTEGER REFERENCES users(id),
                file_counter    INTEGER NOT NULL,
                timestamp       TEXT NOT NULL,
                content         TEXT,
                send_status     TEXT NOT NULL CHECK (send_status IN ('PENDING', 'FAILED', 'SENT'))
            );

            CREATE INDEX idx_draft_replies_source ON draft_replies(source_id, file_counter);

            -- A confirmed reply and a draft never share a uuid
            CREATE TRIGGER replies_reject_draft_uuid
                BEFORE INSERT ON replies
                WHEN EXISTS (SELECT 1 FROM draft_replies WHERE uuid = NEW.uuid)
            BEGIN
                SELECT RAISE(ABORT, 'reply uuid collides with a draft reply');
            END;

            CREATE TRIGGER draft_replies_reject_reply_uuid
                BEFORE INSERT ON draft_replies
                WHEN EXISTS (SELECT 1 FROM replies WHERE uuid = NEW.uuid)
            BEGIN
                SELECT RAISE(ABORT, 'draft uuid collides with a confirmed reply');
            END;

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
