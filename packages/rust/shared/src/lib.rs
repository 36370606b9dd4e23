//! Shared types, error model, and configuration for Shearwater.
//!
//! This crate is the foundation depended on by all other Shearwater crates.
//! It provides:
//! - [`ShearwaterError`] — the unified error type
//! - Domain types ([`Submission`], [`ContentBlock`], [`LayoutBlock`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ModerationConfig, PipelineConfig, PlatformConfig, WorkerConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_token,
};
pub use error::{Result, ShearwaterError};
pub use types::{BLOCK_IMAGE, BLOCK_TEXT, ContentBlock, LAYOUT_ASK, LayoutBlock, Submission};
