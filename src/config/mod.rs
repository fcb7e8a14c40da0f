pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::config::toml_config::{ReportConfig, TimespanConfig};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "transfer-story")]
#[command(about = "Renders a football transfer data story from CSV datasets")]
pub struct CliConfig {
    /// Path to the TOML report definition
    #[arg(short, long, default_value = "report.toml")]
    pub config: String,

    /// Override sources.data_dir
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Override load.output_path
    #[arg(short, long)]
    pub output: Option<String>,

    /// First season year to include
    #[arg(long)]
    pub from_year: Option<i32>,

    /// Last season year to include
    #[arg(long)]
    pub to_year: Option<i32>,

    /// Override thresholds.top_n
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Override thresholds.high_value_fee (millions)
    #[arg(long)]
    pub fee_threshold: Option<f64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU and memory per phase")]
    pub monitor: bool,

    /// Show what would be rendered without reading any data
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Command line values win over the definition file.
    pub fn apply_overrides(&self, config: &mut ReportConfig) {
        if let Some(dir) = &self.data_dir {
            config.sources.data_dir = dir.clone();
        }
        if let Some(output) = &self.output {
            config.load.output_path = output.clone();
        }
        if self.from_year.is_some() || self.to_year.is_some() {
            let span = config.timespan.get_or_insert_with(TimespanConfig::default);
            if self.from_year.is_some() {
                span.from_year = self.from_year;
            }
            if self.to_year.is_some() {
                span.to_year = self.to_year;
            }
        }
        if let Some(n) = self.top_n {
            config.thresholds.top_n = n;
        }
        if let Some(fee) = self.fee_threshold {
            config.thresholds.high_value_fee = fee;
        }
        if self.monitor {
            let monitoring = config
                .monitoring
                .get_or_insert_with(|| toml_config::MonitoringConfig {
                    enabled: true,
                    log_format: None,
                });
            monitoring.enabled = true;
        }
    }
}
