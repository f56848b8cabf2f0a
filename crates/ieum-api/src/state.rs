//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use ieum_chat::ChatService;
use ieum_core::config::IeumConfig;
use ieum_insight::{ReportAnalysisConfig, ReportAnalysisCoordinator};
use ieum_llm::AssistantApi;
use ieum_storage::Database;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<IeumConfig>,
    pub database: Arc<Database>,
    pub chat: Arc<ChatService>,
    pub reports: Arc<ReportAnalysisCoordinator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Wire the chat and report services onto one database and one
    /// upstream assistant API.
    pub fn new(config: IeumConfig, database: Database, api: Arc<dyn AssistantApi>) -> Self {
        let database = Arc::new(database);
        let chat = ChatService::new(api.clone(), database.clone(), &config.chat);
        let reports = ReportAnalysisCoordinator::new(
            api,
            database.clone(),
            ReportAnalysisConfig::from(&config.report),
        );
        Self {
            config: Arc::new(config),
            database,
            chat: Arc::new(chat),
            reports: Arc::new(reports),
            start_time: Instant::now(),
        }
    }
}
