use std::str::FromStr;

use courier_types::SubmissionKind;
use rusqlite::{Connection, Row, params};
use tracing::debug;

use crate::models::{
    DraftReplyRow, NewDraftReply, NewReply, NewSource, NewSubmission, NewUser, ReplyRow,
    SourceRow, SubmissionRow, UserRow,
};
use crate::store::{Change, ChangeSet, Result, Store, StoreError};
use crate::Database;

const SOURCE_COLUMNS: &str = "id, uuid, journalist_designation, is_flagged, public_key, \
     interaction_count, is_starred, last_updated";
const USER_COLUMNS: &str = "id, uuid, username, firstname, lastname";
const SUBMISSION_COLUMNS: &str = "id, uuid, kind, source_id, file_counter, filename, size, \
     download_url, is_downloaded, is_decrypted, is_read, content";
const REPLY_COLUMNS: &str = "id, uuid, source_id, journalist_id, file_counter, filename, size, \
     is_downloaded, is_decrypted, content";
const DRAFT_COLUMNS: &str =
    "id, uuid, source_id, journalist_id, file_counter, timestamp, content, send_status";

impl Store for Database {
    // -- Sources --

    fn sources(&self) -> Result<Vec<SourceRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM sources ORDER BY id", SOURCE_COLUMNS);
            query_all(conn, &sql, [], source_from_row)
        })
    }

    fn source_by_uuid(&self, uuid: &str) -> Result<Option<SourceRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM sources WHERE uuid = ?1", SOURCE_COLUMNS);
            conn.query_row(&sql, [uuid], source_from_row).optional()
        })
    }

    // -- Submissions --

    fn submissions(&self, kind: SubmissionKind) -> Result<Vec<SubmissionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM submissions WHERE kind = ?1 ORDER BY id",
                SUBMISSION_COLUMNS
            );
            query_all(conn, &sql, [kind.as_str()], submission_from_row)
        })
    }

    fn submission_by_uuid(&self, uuid: &str) -> Result<Option<SubmissionRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM submissions WHERE uuid = ?1", SUBMISSION_COLUMNS);
            conn.query_row(&sql, [uuid], submission_from_row).optional()
        })
    }

    fn submissions_for_source(&self, source_id: i64) -> Result<Vec<SubmissionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM submissions WHERE source_id = ?1 ORDER BY file_counter, id",
                SUBMISSION_COLUMNS
            );
            query_all(conn, &sql, [source_id], submission_from_row)
        })
    }

    // -- Replies --

    fn replies(&self) -> Result<Vec<ReplyRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM replies ORDER BY id", REPLY_COLUMNS);
            query_all(conn, &sql, [], reply_from_row)
        })
    }

    fn reply_by_uuid(&self, uuid: &str) -> Result<Option<ReplyRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM replies WHERE uuid = ?1", REPLY_COLUMNS);
            conn.query_row(&sql, [uuid], reply_from_row).optional()
        })
    }

    fn replies_for_source(&self, source_id: i64) -> Result<Vec<ReplyRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM replies WHERE source_id = ?1 ORDER BY file_counter, id",
                REPLY_COLUMNS
            );
            query_all(conn, &sql, [source_id], reply_from_row)
        })
    }

    // -- Drafts --

    fn drafts(&self) -> Result<Vec<DraftReplyRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM draft_replies ORDER BY id", DRAFT_COLUMNS);
            query_all(conn, &sql, [], draft_from_row)
        })
    }

    fn draft_by_uuid(&self, uuid: &str) -> Result<Option<DraftReplyRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM draft_replies WHERE uuid = ?1", DRAFT_COLUMNS);
            conn.query_row(&sql, [uuid], draft_from_row).optional()
        })
    }

    fn drafts_for_source(&self, source_id: i64) -> Result<Vec<DraftReplyRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM draft_replies WHERE source_id = ?1
                 ORDER BY file_counter, timestamp, id",
                DRAFT_COLUMNS
            );
            query_all(conn, &sql, [source_id], draft_from_row)
        })
    }

    fn insert_draft(&self, draft: NewDraftReply) -> Result<DraftReplyRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO draft_replies
                    (uuid, source_id, journalist_id, file_counter, timestamp, content, send_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    draft.uuid,
                    draft.source_id,
                    draft.journalist_id,
                    draft.file_counter,
                    draft.timestamp,
                    draft.content,
                    draft.send_status.as_str(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            Ok(DraftReplyRow {
                id,
                uuid: draft.uuid,
                source_id: draft.source_id,
                journalist_id: draft.journalist_id,
                file_counter: draft.file_counter,
                timestamp: draft.timestamp,
                content: draft.content,
                send_status: draft.send_status,
            })
        })
    }

    // -- Users --

    fn user_by_uuid(&self, uuid: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE uuid = ?1", USER_COLUMNS);
            conn.query_row(&sql, [uuid], user_from_row).optional()
        })
    }

    fn insert_user(&self, user: NewUser) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (uuid, username, firstname, lastname) VALUES (?1, ?2, ?3, ?4)",
                params![user.uuid, user.username, user.firstname, user.lastname],
            )?;
            let id = conn.last_insert_rowid();
            Ok(UserRow {
                id,
                uuid: user.uuid,
                username: user.username,
                firstname: user.firstname,
                lastname: user.lastname,
            })
        })
    }

    // -- Unit of work --

    fn commit(&self, changes: ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        self.with_conn_mut(|conn| {
            let count = changes.len();
            let tx = conn.transaction()?;
            for change in changes {
                apply(&tx, change)?;
            }
            tx.commit()?;
            debug!("Committed {} change(s)", count);
            Ok(())
        })
    }
}

fn apply(conn: &Connection, change: Change) -> Result<()> {
    match change {
        Change::InsertSource(source) => insert_source(conn, &source),
        Change::UpdateSource(source) => {
            let n = conn.execute(
                "UPDATE sources SET journalist_designation = ?2, is_flagged = ?3, public_key = ?4,
                    interaction_count = ?5, is_starred = ?6, last_updated = ?7
                 WHERE id = ?1",
                params![
                    source.id,
                    source.journalist_designation,
                    source.is_flagged,
                    source.public_key,
                    source.interaction_count,
                    source.is_starred,
                    source.last_updated,
                ],
            )?;
            expect_one(n, "source", source.id)
        }
        Change::DeleteSource(id) => {
            // Children first so foreign keys hold at every statement
            conn.execute("DELETE FROM draft_replies WHERE source_id = ?1", [id])?;
            conn.execute("DELETE FROM replies WHERE source_id = ?1", [id])?;
            conn.execute("DELETE FROM submissions WHERE source_id = ?1", [id])?;
            let n = conn.execute("DELETE FROM sources WHERE id = ?1", [id])?;
            expect_one(n, "source", id)
        }
        Change::InsertSubmission(submission) => insert_submission(conn, &submission),
        Change::UpdateSubmission(submission) => {
            let n = conn.execute(
                "UPDATE submissions SET file_counter = ?2, filename = ?3, size = ?4,
                    download_url = ?5, is_downloaded = ?6, is_decrypted = ?7, is_read = ?8,
                    content = ?9
                 WHERE id = ?1",
                params![
                    submission.id,
                    submission.file_counter,
                    submission.filename,
                    submission.size,
                    submission.download_url,
                    submission.is_downloaded,
                    submission.is_decrypted,
                    submission.is_read,
                    submission.content,
                ],
            )?;
            expect_one(n, "submission", submission.id)
        }
        Change::DeleteSubmission(id) => {
            let n = conn.execute("DELETE FROM submissions WHERE id = ?1", [id])?;
            expect_one(n, "submission", id)
        }
        Change::InsertReply(reply) => insert_reply(conn, &reply),
        Change::UpdateReply(reply) => {
            let n = conn.execute(
                "UPDATE replies SET journalist_id = ?2, file_counter = ?3, filename = ?4,
                    size = ?5, is_downloaded = ?6, is_decrypted = ?7, content = ?8
                 WHERE id = ?1",
                params![
                    reply.id,
                    reply.journalist_id,
                    reply.file_counter,
                    reply.filename,
                    reply.size,
                    reply.is_downloaded,
                    reply.is_decrypted,
                    reply.content,
                ],
            )?;
            expect_one(n, "reply", reply.id)
        }
        Change::DeleteReply(id) => {
            let n = conn.execute("DELETE FROM replies WHERE id = ?1", [id])?;
            expect_one(n, "reply", id)
        }
        Change::UpdateUser(user) => {
            let n = conn.execute(
                "UPDATE users SET username = ?2, firstname = ?3, lastname = ?4 WHERE id = ?1",
                params![user.id, user.username, user.firstname, user.lastname],
            )?;
            expect_one(n, "user", user.id)
        }
        Change::UpdateDraft(draft) => {
            let n = conn.execute(
                "UPDATE draft_replies SET file_counter = ?2, timestamp = ?3, content = ?4,
                    send_status = ?5
                 WHERE id = ?1",
                params![
                    draft.id,
                    draft.file_counter,
                    draft.timestamp,
                    draft.content,
                    draft.send_status.as_str(),
                ],
            )?;
            expect_one(n, "draft reply", draft.id)
        }
        Change::DeleteDraft(id) => {
            let n = conn.execute("DELETE FROM draft_replies WHERE id = ?1", [id])?;
            expect_one(n, "draft reply", id)
        }
    }
}

fn insert_source(conn: &Connection, source: &NewSource) -> Result<()> {
    conn.execute(
        "INSERT INTO sources (uuid, journalist_designation, is_flagged, public_key,
            interaction_count, is_starred, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            source.uuid,
            source.journalist_designation,
            source.is_flagged,
            source.public_key,
            source.interaction_count,
            source.is_starred,
            source.last_updated,
        ],
    )?;
    Ok(())
}

fn insert_submission(conn: &Connection, submission: &NewSubmission) -> Result<()> {
    conn.execute(
        "INSERT INTO submissions (uuid, kind, source_id, file_counter, filename, size,
            download_url, is_downloaded, is_read)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
        params![
            submission.uuid,
            submission.kind.as_str(),
            submission.source_id,
            submission.file_counter,
            submission.filename,
            submission.size,
            submission.download_url,
            submission.is_read,
        ],
    )?;
    Ok(())
}

fn insert_reply(conn: &Connection, reply: &NewReply) -> Result<()> {
    conn.execute(
        "INSERT INTO replies (uuid, source_id, journalist_id, file_counter, filename, size,
            is_downloaded)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
        params![
            reply.uuid,
            reply.source_id,
            reply.journalist_id,
            reply.file_counter,
            reply.filename,
            reply.size,
        ],
    )?;
    Ok(())
}

fn expect_one(affected: usize, table: &str, id: i64) -> Result<()> {
    if affected == 1 {
        Ok(())
    } else {
        Err(StoreError::Constraint(format!("no {} row with id {}", table, id)))
    }
}

fn query_all<P, T, F>(conn: &Connection, sql: &str, params: P, f: F) -> Result<Vec<T>>
where
    P: rusqlite::Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, f)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<SourceRow> {
    Ok(SourceRow {
        id: row.get(0)?,
        uuid: row.get(1)?,
        journalist_designation: row.get(2)?,
        is_flagged: row.get(3)?,
        public_key: row.get(4)?,
        interaction_count: row.get(5)?,
        is_starred: row.get(6)?,
        last_updated: row.get(7)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        uuid: row.get(1)?,
        username: row.get(2)?,
        firstname: row.get(3)?,
        lastname: row.get(4)?,
    })
}

fn submission_from_row(row: &Row<'_>) -> rusqlite::Result<SubmissionRow> {
    Ok(SubmissionRow {
        id: row.get(0)?,
        uuid: row.get(1)?,
        kind: parse_column(row, 2)?,
        source_id: row.get(3)?,
        file_counter: row.get(4)?,
        filename: row.get(5)?,
        size: row.get(6)?,
        download_url: row.get(7)?,
        is_downloaded: row.get(8)?,
        is_decrypted: row.get(9)?,
        is_read: row.get(10)?,
        content: row.get(11)?,
    })
}

fn reply_from_row(row: &Row<'_>) -> rusqlite::Result<ReplyRow> {
    Ok(ReplyRow {
        id: row.get(0)?,
        uuid: row.get(1)?,
        source_id: row.get(2)?,
        journalist_id: row.get(3)?,
        file_counter: row.get(4)?,
        filename: row.get(5)?,
        size: row.get(6)?,
        is_downloaded: row.get(7)?,
        is_decrypted: row.get(8)?,
        content: row.get(9)?,
    })
}

fn draft_from_row(row: &Row<'_>) -> rusqlite::Result<DraftReplyRow> {
    Ok(DraftReplyRow {
        id: row.get(0)?,
        uuid: row.get(1)?,
        source_id: row.get(2)?,
        journalist_id: row.get(3)?,
        file_counter: row.get(4)?,
        timestamp: row.get(5)?,
        content: row.get(6)?,
        send_status: parse_column(row, 7)?,
    })
}

/// Reads a TEXT column holding one of our enum spellings.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
