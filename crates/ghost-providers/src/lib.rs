//! HTTP clients for the paid upstream providers.
//!
//! - FullEnrich bulk contact enrichment (`EnrichmentProvider`)
//! - Gemini text generation (`TextGenerator`)
//!
//! Both are constructed once at startup and injected behind their traits so
//! the orchestration layer can be driven by scripted fakes in tests.

pub mod error;
pub mod fullenrich;
pub mod gemini;

pub use error::{ProviderError, ProviderResult};
pub use fullenrich::{BulkEnrichment, BulkEntry, BulkStatus, EnrichmentProvider, FullEnrichClient};
pub use gemini::{GeminiClient, Generation, TextGenerator};
