//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod fund;
pub mod llm;
pub mod log;
pub mod returns;

// Re-export main types for cleaner imports
pub use cache::Cache;
pub use fund::{FundDataProvider, FundDetail, FundSummary, Horizon, NavPoint};
pub use llm::{ChatMessage, ChatRole, TextGenerator};
