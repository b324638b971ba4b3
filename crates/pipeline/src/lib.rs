//! Applies approved suggestions to storage.
//!
//! [`batch::SuggestionBatchProcessor`] is the entry point. It validates each
//! suggestion, checks project access through a cached
//! [`access::ProjectAccessValidator`], builds coerced write payloads and
//! reports per-item outcomes in a single [`leasetrack_core::suggestion::BatchResult`].

pub mod access;
pub mod batch;
pub mod config;
pub mod payload;

pub use access::{ProjectAccess, ProjectAccessValidator};
pub use batch::SuggestionBatchProcessor;
pub use config::PipelineConfig;
