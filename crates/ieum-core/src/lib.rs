pub mod config;
pub mod error;
pub mod indicator;
pub mod types;

pub use config::IeumConfig;
pub use error::{IeumError, Result};
pub use indicator::{IndicatorKind, IndicatorResult, IndicatorValue};
pub use types::*;
