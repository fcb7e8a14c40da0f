pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::app::pipelines::story_pipeline::StoryPipeline;
pub use crate::config::{cli::LocalStorage, toml_config::ReportConfig};
pub use crate::core::etl::ReportEngine;
pub use crate::utils::error::{ReportError, Result};
