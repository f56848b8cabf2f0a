//! Report analysis coordinator.
//!
//! Sends the window's conversation log to the dedicated analysis assistant,
//! parses the answer, validates each indicator against its value set and
//! completes the report. Nothing is written unless the whole upstream part
//! succeeds, so a failed analysis leaves the report PENDING.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use ieum_chat::EventStreamDecoder;
use ieum_core::config::ReportConfig;
use ieum_core::indicator::{IndicatorKind, IndicatorResult};
use ieum_core::types::{Message, Report, ReportStatus};
use ieum_llm::{AssistantApi, MessageRole};
use ieum_storage::{Database, MessageRepository, ReportRepository};

use crate::error::InsightError;
use crate::parser::{ReportAnalysisParser, SUMMARY_KEY};

#[derive(Debug, Clone)]
pub struct ReportAnalysisConfig {
    pub assistant_id: String,
    pub thread_id: String,
    pub run_timeout: Duration,
}

impl From<&ReportConfig> for ReportAnalysisConfig {
    fn from(config: &ReportConfig) -> Self {
        Self {
            assistant_id: config.assistant_id.clone(),
            thread_id: config.thread_id.clone(),
            run_timeout: Duration::from_secs(config.run_timeout_secs),
        }
    }
}

pub struct ReportAnalysisCoordinator {
    api: Arc<dyn AssistantApi>,
    db: Arc<Database>,
    parser: ReportAnalysisParser,
    config: ReportAnalysisConfig,
}

impl ReportAnalysisCoordinator {
    pub fn new(api: Arc<dyn AssistantApi>, db: Arc<Database>, config: ReportAnalysisConfig) -> Self {
        Self {
            api,
            db,
            parser: ReportAnalysisParser::new(),
            config,
        }
    }

    /// Load a report and its message window, then analyze it.
    ///
    /// A report that is already COMPLETE is returned unchanged.
    pub async fn complete_report(&self, report_id: Uuid) -> Result<Report, InsightError> {
        let db = self.db.clone();
        let (report, messages) =
            tokio::task::spawn_blocking(move || -> Result<(Report, Vec<Message>), InsightError> {
                let report = ReportRepository::new(db.clone())
                    .find_by_id(report_id)?
                    .ok_or_else(|| InsightError::NotFound(format!("report {}", report_id)))?;
                if report.status == ReportStatus::Complete {
                    return Ok((report, Vec::new()));
                }
                let messages = MessageRepository::new(db).find_in_window(
                    report.elderly_id,
                    report.start_date,
                    report.window_end(),
                )?;
                Ok((report, messages))
            })
            .await??;

        if report.status == ReportStatus::Complete {
            debug!(report_id = %report_id, "Report already complete");
            return Ok(report);
        }

        self.analyze(report, &messages).await
    }

    /// Analyze `messages` into `report`, mark it COMPLETE and persist it.
    pub async fn analyze(
        &self,
        mut report: Report,
        messages: &[Message],
    ) -> Result<Report, InsightError> {
        if self.config.assistant_id.is_empty() || self.config.thread_id.is_empty() {
            return Err(InsightError::Config(
                "report assistant id and thread id must be configured".to_string(),
            ));
        }
        if messages.is_empty() {
            return Err(InsightError::InsufficientData(format!(
                "no messages for report {} between {} and {}",
                report.id,
                report.start_date,
                report.window_end()
            )));
        }

        let transcript = messages
            .iter()
            .map(Message::transcript_line)
            .collect::<Vec<_>>()
            .join("\n");

        let answer =
            match tokio::time::timeout(self.config.run_timeout, self.request_analysis(&transcript))
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        report_id = %report.id,
                        timeout_secs = self.config.run_timeout.as_secs(),
                        "Analysis run did not complete in time"
                    );
                    return Err(InsightError::UpstreamTimeout(format!(
                        "no completed analysis within {}s",
                        self.config.run_timeout.as_secs()
                    )));
                }
            };

        let parsed = self.parser.parse(&answer);
        apply_analysis(&mut report, parsed);

        let db = self.db.clone();
        let stored = report.clone();
        tokio::task::spawn_blocking(move || ReportRepository::new(db).save_analysis(&stored))
            .await??;

        info!(
            report_id = %report.id,
            indicators = report.indicator_results.len(),
            messages = messages.len(),
            "Report analysis complete"
        );
        Ok(report)
    }

    async fn request_analysis(&self, transcript: &str) -> Result<String, InsightError> {
        self.api
            .create_message(&self.config.thread_id, MessageRole::User, transcript)
            .await?;
        let events = self
            .api
            .start_run(&self.config.thread_id, &self.config.assistant_id)
            .await?;
        Ok(EventStreamDecoder::final_answer(events).await?)
    }
}

/// Fold parsed results into `report` and mark it COMPLETE.
///
/// The summary entry's reason becomes the qualitative summary. Indicators
/// that are missing or carry a value outside their kind's set are skipped.
pub fn apply_analysis(report: &mut Report, mut parsed: BTreeMap<String, IndicatorResult>) {
    if let Some(summary) = parsed.remove(SUMMARY_KEY) {
        report.qualitative_summary = Some(summary.reason);
    }

    for kind in IndicatorKind::ALL {
        let Some(result) = parsed.remove(kind.analysis_key()) else {
            warn!(report_id = %report.id, indicator = %kind, "Indicator missing from analysis");
            continue;
        };
        match kind.parse_value(&result.value) {
            Some(value) => report.set_indicator(value, result.reason),
            None => warn!(
                report_id = %report.id,
                indicator = %kind,
                value = %result.value,
                "Indicator value outside its value set"
            ),
        }
    }

    for name in parsed.keys() {
        debug!(report_id = %report.id, name = %name, "Ignoring unknown analysis entry");
    }

    report.status = ReportStatus::Complete;
}
