//! Ieum Storage crate - SQLite persistence for elderly profiles,
//! assistants, the message log and wellbeing reports.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{AssistantRepository, ElderlyRepository, MessageRepository, ReportRepository};
