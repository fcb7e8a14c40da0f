use crate::adapters::{csv_source, csv_table};
use crate::config::toml_config::ReportConfig;
use crate::core::report;
use crate::core::{Dataset, Pipeline, Report, Storage};
use crate::utils::error::Result;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const REPORT_FILE: &str = "report.json";

/// Reads CSV datasets from `source`, renders the report definition and
/// writes the results to `sink`.
pub struct StoryPipeline<S: Storage> {
    pub(crate) source: S,
    pub(crate) sink: S,
    pub(crate) config: ReportConfig,
}

impl<S: Storage> StoryPipeline<S> {
    pub fn new(source: S, sink: S, config: ReportConfig) -> Self {
        Self {
            source,
            sink,
            config,
        }
    }

    /// (file name, contents) for every output the definition asks for.
    fn render_outputs(&self, report: &Report) -> Result<Vec<(String, Vec<u8>)>> {
        let mut files = Vec::new();

        if self.config.wants_format("json") {
            files.push((
                REPORT_FILE.to_string(),
                serde_json::to_vec_pretty(report)?,
            ));
        }

        if self.config.wants_format("csv") {
            for section in &report.sections {
                if let Some(chart) = &section.chart {
                    files.push((
                        format!("tables/{}.csv", section.id),
                        csv_table::chart_table(chart)?,
                    ));
                }
            }
        }

        Ok(files)
    }
}

fn bundle(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file(name.as_str(), SimpleFileOptions::default())?;
        zip.write_all(data)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for StoryPipeline<S> {
    async fn extract(&self) -> Result<Dataset> {
        let mapping = self.config.sources.field_mapping.as_ref();

        let mut transfers = Vec::new();
        for file in &self.config.sources.transfers {
            tracing::info!("📄 Loading transfers from {}", file);
            let data = self.source.read_file(file).await?;
            transfers.extend(csv_source::read_transfers(&data, file, mapping)?);
        }

        let mut matches = Vec::new();
        for file in &self.config.sources.matches {
            tracing::info!("📄 Loading matches from {}", file);
            let data = self.source.read_file(file).await?;
            matches.extend(csv_source::read_matches(&data, file, mapping)?);
        }

        Ok(Dataset::new(transfers, matches))
    }

    async fn transform(&self, data: Dataset) -> Result<Report> {
        if data.is_empty() {
            tracing::warn!("No records loaded, every section will be empty");
        }
        report::render_report(&self.config, &data)
    }

    async fn load(&self, report: Report) -> Result<String> {
        let files = self.render_outputs(&report)?;
        tracing::debug!("Writing {} output files", files.len());

        if let Some(bundle_name) = self.config.bundle_name() {
            let zip_data = bundle(&files)?;
            tracing::debug!("Writing ZIP bundle ({} bytes)", zip_data.len());
            self.sink.write_file(bundle_name, &zip_data).await?;
            return Ok(format!("{}/{}", self.config.output_path(), bundle_name));
        }

        for (name, data) in &files {
            self.sink.write_file(name, data).await?;
        }

        let primary = if self.config.wants_format("json") {
            REPORT_FILE.to_string()
        } else {
            "tables".to_string()
        };
        Ok(format!("{}/{}", self.config.output_path(), primary))
    }
}
