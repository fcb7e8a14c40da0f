use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;

/// Drives a pipeline through extract, transform and load.
pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
    monitoring: bool,
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitoring: false,
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitoring: bool) -> Self {
        Self {
            pipeline,
            monitoring,
        }
    }

    pub async fn run(&self) -> Result<String> {
        let mut monitor = RunMonitor::new(self.monitoring);
        tracing::info!("🚀 Starting report run");

        let dataset = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} transfers, {} matches",
            dataset.transfers.len(),
            dataset.matches.len()
        );
        monitor.log_phase("extract");

        let report = self.pipeline.transform(dataset).await?;
        tracing::info!(
            "🛠️ Rendered {} sections ({} empty)",
            report.sections.len(),
            report.empty_sections()
        );
        monitor.log_phase("transform");

        let output_path = self.pipeline.load(report).await?;
        tracing::info!("💾 Output saved to: {}", output_path);
        monitor.log_phase("load");
        monitor.log_final();

        Ok(output_path)
    }
}
