pub mod config;
pub mod error;
pub mod extractor;
pub mod failure_log;
pub mod fetcher;
pub mod layout;
pub mod metadata;
pub mod pipeline;
pub mod tool;
