pub mod mfapi;
pub mod openai;

pub use mfapi::MfapiProvider;
pub use openai::OpenAiChatProvider;

// Re-export traits for providers to easily use cache
pub use crate::core::cache::Cache;
pub use crate::store::memory::MemoryCache;
