use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Local, Months, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::indicator::{IndicatorKind, IndicatorValue};

// =============================================================================
// Enums
// =============================================================================

/// Author of a persisted chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Written by the elderly user.
    User,
    /// Produced by the assistant.
    Ai,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::User => "USER",
            MessageType::Ai => "AI",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(MessageType::User),
            "AI" => Some(MessageType::Ai),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Female,
    #[default]
    Male,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "FEMALE",
            Gender::Male => "MALE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FEMALE" => Some(Gender::Female),
            "MALE" => Some(Gender::Male),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    Weekly,
    Monthly,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Weekly => "WEEKLY",
            ReportType::Monthly => "MONTHLY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WEEKLY" => Some(ReportType::Weekly),
            "MONTHLY" => Some(ReportType::Monthly),
            _ => None,
        }
    }

    /// End (exclusive) of the message window that starts at `start`.
    pub fn window_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            ReportType::Weekly => start + chrono::Duration::days(7),
            ReportType::Monthly => start
                .checked_add_months(Months::new(1))
                .unwrap_or(start + chrono::Duration::days(30)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    /// Created at report-day rollover, awaiting analysis.
    Pending,
    /// Analysis applied.
    Complete,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::Complete => "COMPLETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ReportStatus::Pending),
            "COMPLETE" => Some(ReportStatus::Complete),
            _ => None,
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// One turn of an elderly user's conversation log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub elderly_id: Uuid,
    pub content: String,
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(elderly_id: Uuid, message_type: MessageType, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            elderly_id,
            content: content.into(),
            message_type,
            created_at: now_millis(),
        }
    }

    /// `"<TYPE>: <content>"`, the line format used in analysis transcripts.
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.message_type.as_str(), self.content)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Elderly {
    pub id: Uuid,
    pub name: String,
    pub gender: Gender,
    pub assistant_id: Option<Uuid>,
    /// Creation time of the USER message of the latest completed exchange.
    pub last_chat_at: Option<DateTime<Utc>>,
    pub report_day: Weekday,
}

impl Elderly {
    pub fn new(name: impl Into<String>, gender: Gender, report_day: Weekday) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            gender,
            assistant_id: None,
            last_chat_at: None,
            report_day,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assistant {
    pub id: Uuid,
    pub name: String,
    pub personality: String,
    /// Handle of the external conversation thread, if one was created.
    pub thread_handle: Option<String>,
    pub external_assistant_id: String,
}

impl Assistant {
    pub fn new(
        name: impl Into<String>,
        personality: impl Into<String>,
        external_assistant_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            personality: personality.into(),
            thread_handle: None,
            external_assistant_id: external_assistant_id.into(),
        }
    }
}

/// A validated indicator score with its justification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicatorEntry {
    pub value: IndicatorValue,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub elderly_id: Uuid,
    pub report_type: ReportType,
    pub status: ReportStatus,
    pub start_date: DateTime<Utc>,
    pub indicator_results: BTreeMap<IndicatorKind, IndicatorEntry>,
    pub qualitative_summary: Option<String>,
}

impl Report {
    /// A fresh pending report for the window starting at `start_date`.
    pub fn pending(elderly_id: Uuid, report_type: ReportType, start_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            elderly_id,
            report_type,
            status: ReportStatus::Pending,
            start_date,
            indicator_results: BTreeMap::new(),
            qualitative_summary: None,
        }
    }

    /// End (exclusive) of the message window covered by this report.
    pub fn window_end(&self) -> DateTime<Utc> {
        self.report_type.window_end(self.start_date)
    }

    /// Store a validated indicator. The entry is keyed by the value's own kind.
    pub fn set_indicator(&mut self, value: IndicatorValue, reason: impl Into<String>) {
        self.indicator_results.insert(
            value.kind(),
            IndicatorEntry {
                value,
                reason: reason.into(),
            },
        );
    }
}

// =============================================================================
// Time helpers
// =============================================================================

/// Current UTC time truncated to millisecond precision, the resolution
/// timestamps are persisted with.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now)
}

/// Format a timestamp for chat responses, in the server's local time zone.
pub fn format_chat_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Stable numeric encoding of a weekday (Monday = 0).
pub fn weekday_to_index(day: Weekday) -> u32 {
    day.num_days_from_monday()
}

pub fn weekday_from_index(index: u32) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Weekday a timestamp falls on, in UTC.
pub fn weekday_of(ts: DateTime<Utc>) -> Weekday {
    ts.weekday()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::{ActivityLevel, SupportNeeds};

    #[test]
    fn test_message_type_roundtrip() {
        for t in [MessageType::User, MessageType::Ai] {
            assert_eq!(MessageType::parse(t.as_str()), Some(t));
        }
        assert_eq!(MessageType::parse("user"), None);
    }

    #[test]
    fn test_transcript_line_format() {
        let msg = Message::new(Uuid::new_v4(), MessageType::Ai, "좋은 아침이에요");
        assert_eq!(msg.transcript_line(), "AI: 좋은 아침이에요");
    }

    #[test]
    fn test_message_new_has_millisecond_precision() {
        let msg = Message::new(Uuid::new_v4(), MessageType::User, "hi");
        assert_eq!(msg.created_at.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_gender_default_and_parse() {
        assert_eq!(Gender::default(), Gender::Male);
        assert_eq!(Gender::parse("FEMALE"), Some(Gender::Female));
        assert_eq!(Gender::parse("female"), None);
    }

    #[test]
    fn test_weekly_window_is_seven_days() {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let end = ReportType::Weekly.window_end(start);
        assert_eq!((end - start).num_days(), 7);
    }

    #[test]
    fn test_monthly_window_is_one_calendar_month() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let end = ReportType::Monthly.window_end(start);
        // chrono clamps to the last day of February in a leap year.
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_report_pending_starts_empty() {
        let report = Report::pending(Uuid::new_v4(), ReportType::Monthly, Utc::now());
        assert_eq!(report.status, ReportStatus::Pending);
        assert!(report.indicator_results.is_empty());
        assert!(report.qualitative_summary.is_none());
    }

    #[test]
    fn test_set_indicator_keys_by_value_kind() {
        let mut report = Report::pending(Uuid::new_v4(), ReportType::Weekly, Utc::now());
        report.set_indicator(IndicatorValue::ActivityLevel(ActivityLevel::Good), "활발함");
        report.set_indicator(IndicatorValue::SupportNeeds(SupportNeeds::Low), "자립적");
        assert_eq!(report.indicator_results.len(), 2);
        assert_eq!(
            report.indicator_results[&IndicatorKind::ActivityLevel].reason,
            "활발함"
        );
    }

    #[test]
    fn test_report_json_roundtrip_keeps_indicators() {
        let mut report = Report::pending(Uuid::new_v4(), ReportType::Weekly, now_millis());
        report.set_indicator(IndicatorValue::ActivityLevel(ActivityLevel::Fair), "보통");
        let json = serde_json::to_string(&report).unwrap();
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_weekday_index_roundtrip() {
        for i in 0..7 {
            let day = weekday_from_index(i).unwrap();
            assert_eq!(weekday_to_index(day), i);
        }
        assert!(weekday_from_index(7).is_none());
    }

    #[test]
    fn test_format_chat_timestamp_shape() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let s = format_chat_timestamp(ts);
        assert_eq!(s.len(), "2024-05-01 12:30".len());
        assert!(s.contains('-') && s.contains(':'));
    }
}
