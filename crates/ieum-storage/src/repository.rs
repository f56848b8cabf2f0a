//! Repository implementations for SQLite-backed persistence.
//!
//! Each repository wraps a shared `Database` and maps rows to the domain
//! types in `ieum_core::types`. Timestamps are stored as epoch milliseconds.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use ieum_core::error::IeumError;
use ieum_core::indicator::IndicatorKind;
use ieum_core::types::{
    weekday_from_index, weekday_to_index, Assistant, Elderly, Gender, IndicatorEntry, Message,
    MessageType, Report, ReportStatus, ReportType,
};

use crate::db::Database;

fn storage_err(e: rusqlite::Error) -> IeumError {
    IeumError::Storage(e.to_string())
}

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, IeumError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| IeumError::InvalidData(format!("Invalid timestamp: {}", ms)))
}

fn parse_uuid(s: &str) -> Result<Uuid, IeumError> {
    Uuid::parse_str(s).map_err(|e| IeumError::InvalidData(format!("Invalid UUID: {}", e)))
}

// =============================================================================
// ElderlyRepository
// =============================================================================

/// Repository for elderly profiles.
///
/// Registration and profile editing live outside this backend core; this
/// repository only covers what the chat and report flows read and write.
pub struct ElderlyRepository {
    db: Arc<Database>,
}

impl ElderlyRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, elderly: &Elderly) -> Result<(), IeumError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO elderly (id, name, gender, assistant_id, last_chat_at, report_day)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    elderly.id.to_string(),
                    elderly.name,
                    elderly.gender.as_str(),
                    elderly.assistant_id.map(|id| id.to_string()),
                    elderly.last_chat_at.map(to_millis),
                    weekday_to_index(elderly.report_day),
                ],
            )
            .map_err(|e| IeumError::Storage(format!("Failed to save elderly: {}", e)))?;
            Ok(())
        })
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Elderly>, IeumError> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, gender, assistant_id, last_chat_at, report_day
                     FROM elderly WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, Option<i64>>(4)?,
                            row.get::<_, u32>(5)?,
                        ))
                    },
                )
                .optional()
                .map_err(storage_err)?;

            let Some((id, name, gender, assistant_id, last_chat_at, report_day)) = row else {
                return Ok(None);
            };

            Ok(Some(Elderly {
                id: parse_uuid(&id)?,
                name,
                gender: Gender::parse(&gender)
                    .ok_or_else(|| IeumError::InvalidData(format!("Unknown gender: {}", gender)))?,
                assistant_id: assistant_id.as_deref().map(parse_uuid).transpose()?,
                last_chat_at: last_chat_at.map(from_millis).transpose()?,
                report_day: weekday_from_index(report_day).ok_or_else(|| {
                    IeumError::InvalidData(format!("Invalid report day: {}", report_day))
                })?,
            }))
        })
    }
}

// =============================================================================
// AssistantRepository
// =============================================================================

/// Repository for chat assistants and their external thread handles.
pub struct AssistantRepository {
    db: Arc<Database>,
}

impl AssistantRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, assistant: &Assistant) -> Result<(), IeumError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO assistants (id, name, personality, thread_handle, external_assistant_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    assistant.id.to_string(),
                    assistant.name,
                    assistant.personality,
                    assistant.thread_handle,
                    assistant.external_assistant_id,
                ],
            )
            .map_err(|e| IeumError::Storage(format!("Failed to save assistant: {}", e)))?;
            Ok(())
        })
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Assistant>, IeumError> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, personality, thread_handle, external_assistant_id
                     FROM assistants WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .optional()
                .map_err(storage_err)?;

            match row {
                Some((id, name, personality, thread_handle, external_assistant_id)) => {
                    Ok(Some(Assistant {
                        id: parse_uuid(&id)?,
                        name,
                        personality,
                        thread_handle,
                        external_assistant_id,
                    }))
                }
                None => Ok(None),
            }
        })
    }

    /// Overwrite the stored thread handle. Single-row update, last writer wins.
    pub fn update_thread_handle(&self, id: Uuid, handle: &str) -> Result<(), IeumError> {
        self.db.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE assistants SET thread_handle = ?1 WHERE id = ?2",
                    rusqlite::params![handle, id.to_string()],
                )
                .map_err(|e| IeumError::Storage(format!("Failed to update thread: {}", e)))?;
            if updated == 0 {
                return Err(IeumError::NotFound(format!("assistant {}", id)));
            }
            debug!(assistant_id = %id, "Thread handle updated");
            Ok(())
        })
    }
}

// =============================================================================
// MessageRepository
// =============================================================================

/// Repository for the append-only per-elderly message log.
pub struct MessageRepository {
    db: Arc<Database>,
}

impl MessageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Persist one completed exchange.
    ///
    /// Inserts the USER and AI messages and sets the elderly's
    /// `last_chat_at` to the USER message's creation time, all in a single
    /// transaction.
    pub fn record_exchange(&self, user: &Message, ai: &Message) -> Result<(), IeumError> {
        if user.message_type != MessageType::User || ai.message_type != MessageType::Ai {
            return Err(IeumError::InvalidData(
                "exchange must be one USER and one AI message".to_string(),
            ));
        }
        if user.elderly_id != ai.elderly_id {
            return Err(IeumError::InvalidData(
                "exchange messages belong to different elderly".to_string(),
            ));
        }

        self.db.with_transaction(|tx| {
            insert_message(tx, user)?;
            insert_message(tx, ai)?;
            let updated = tx
                .execute(
                    "UPDATE elderly SET last_chat_at = ?1 WHERE id = ?2",
                    rusqlite::params![to_millis(user.created_at), user.elderly_id.to_string()],
                )
                .map_err(|e| IeumError::Storage(format!("Failed to update last chat: {}", e)))?;
            if updated == 0 {
                return Err(IeumError::NotFound(format!("elderly {}", user.elderly_id)));
            }
            Ok(())
        })
    }

    /// Newest-first page of an elderly's messages.
    ///
    /// `before` is the id of the last message already seen; the page starts
    /// right after it in `(created_at, rowid)` order, so messages sharing a
    /// millisecond are never skipped. An id that is not one of this elderly's
    /// messages is rejected.
    pub fn find_page(
        &self,
        elderly_id: Uuid,
        before: Option<Uuid>,
        limit: u32,
    ) -> Result<Vec<Message>, IeumError> {
        self.db.with_conn(|conn| {
            let (before_at, before_rowid) = match before {
                Some(cursor) => conn
                    .query_row(
                        "SELECT created_at, rowid FROM messages WHERE id = ?1 AND elderly_id = ?2",
                        rusqlite::params![cursor.to_string(), elderly_id.to_string()],
                        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
                    )
                    .optional()
                    .map_err(storage_err)?
                    .ok_or_else(|| IeumError::InvalidInput(format!("Unknown cursor: {}", cursor)))?,
                None => (i64::MAX, i64::MAX),
            };

            let mut stmt = conn
                .prepare(
                    "SELECT id, elderly_id, content, message_type, created_at
                     FROM messages
                     WHERE elderly_id = ?1
                       AND (created_at < ?2 OR (created_at = ?2 AND rowid < ?3))
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?4",
                )
                .map_err(storage_err)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![elderly_id.to_string(), before_at, before_rowid, limit],
                    read_message_row,
                )
                .map_err(storage_err)?;
            collect_messages(rows)
        })
    }

    /// Chronological messages of an elderly within `[start, end)`.
    pub fn find_in_window(
        &self,
        elderly_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Message>, IeumError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, elderly_id, content, message_type, created_at
                     FROM messages
                     WHERE elderly_id = ?1 AND created_at >= ?2 AND created_at < ?3
                     ORDER BY created_at ASC, rowid ASC",
                )
                .map_err(storage_err)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![elderly_id.to_string(), to_millis(start), to_millis(end)],
                    read_message_row,
                )
                .map_err(storage_err)?;
            collect_messages(rows)
        })
    }

    pub fn count_by_elderly(&self, elderly_id: Uuid) -> Result<u64, IeumError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM messages WHERE elderly_id = ?1",
                    rusqlite::params![elderly_id.to_string()],
                    |row| row.get(0),
                )
                .map_err(storage_err)?;
            Ok(count as u64)
        })
    }
}

type MessageRow = (String, String, String, String, i64);

fn read_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn collect_messages(
    rows: impl Iterator<Item = rusqlite::Result<MessageRow>>,
) -> Result<Vec<Message>, IeumError> {
    let mut messages = Vec::new();
    for row in rows {
        let (id, elderly_id, content, message_type, created_at) = row.map_err(storage_err)?;
        messages.push(Message {
            id: parse_uuid(&id)?,
            elderly_id: parse_uuid(&elderly_id)?,
            content,
            message_type: MessageType::parse(&message_type).ok_or_else(|| {
                IeumError::InvalidData(format!("Unknown message type: {}", message_type))
            })?,
            created_at: from_millis(created_at)?,
        });
    }
    Ok(messages)
}

fn insert_message(conn: &Connection, message: &Message) -> Result<(), IeumError> {
    conn.execute(
        "INSERT INTO messages (id, elderly_id, content, message_type, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            message.id.to_string(),
            message.elderly_id.to_string(),
            message.content,
            message.message_type.as_str(),
            to_millis(message.created_at),
        ],
    )
    .map_err(|e| IeumError::Storage(format!("Failed to save message: {}", e)))?;
    Ok(())
}

// =============================================================================
// ReportRepository
// =============================================================================

/// Repository for weekly and monthly wellbeing reports.
pub struct ReportRepository {
    db: Arc<Database>,
}

impl ReportRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a report exactly as given, including its type.
    pub fn create(&self, report: &Report) -> Result<(), IeumError> {
        let indicators = serde_json::to_string(&report.indicator_results)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (id, elderly_id, report_type, status, start_date, indicators, qualitative_summary)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    report.id.to_string(),
                    report.elderly_id.to_string(),
                    report.report_type.as_str(),
                    report.status.as_str(),
                    to_millis(report.start_date),
                    indicators,
                    report.qualitative_summary,
                ],
            )
            .map_err(|e| IeumError::Storage(format!("Failed to save report: {}", e)))?;
            Ok(())
        })
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Report>, IeumError> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, elderly_id, report_type, status, start_date, indicators, qualitative_summary
                     FROM reports WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, Option<String>>(6)?,
                        ))
                    },
                )
                .optional()
                .map_err(storage_err)?;

            let Some((id, elderly_id, report_type, status, start_date, indicators, summary)) = row
            else {
                return Ok(None);
            };

            let indicator_results: BTreeMap<IndicatorKind, IndicatorEntry> =
                serde_json::from_str(&indicators)?;

            Ok(Some(Report {
                id: parse_uuid(&id)?,
                elderly_id: parse_uuid(&elderly_id)?,
                report_type: ReportType::parse(&report_type).ok_or_else(|| {
                    IeumError::InvalidData(format!("Unknown report type: {}", report_type))
                })?,
                status: ReportStatus::parse(&status).ok_or_else(|| {
                    IeumError::InvalidData(format!("Unknown report status: {}", status))
                })?,
                start_date: from_millis(start_date)?,
                indicator_results,
                qualitative_summary: summary,
            }))
        })
    }

    /// Persist the analysis outcome of a report: status, indicators and
    /// summary. Type, owner and window are never rewritten.
    pub fn save_analysis(&self, report: &Report) -> Result<(), IeumError> {
        let indicators = serde_json::to_string(&report.indicator_results)?;
        self.db.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE reports SET status = ?1, indicators = ?2, qualitative_summary = ?3
                     WHERE id = ?4",
                    rusqlite::params![
                        report.status.as_str(),
                        indicators,
                        report.qualitative_summary,
                        report.id.to_string(),
                    ],
                )
                .map_err(|e| IeumError::Storage(format!("Failed to update report: {}", e)))?;
            if updated == 0 {
                return Err(IeumError::NotFound(format!("report {}", report.id)));
            }
            Ok(())
        })
    }
}
