use anyhow::Context;
use clap::Parser;
use transfer_story::config::toml_config::{ChartDefinition, ReportConfig};
use transfer_story::utils::error::ErrorSeverity;
use transfer_story::utils::{logger, validation::Validate};
use transfer_story::{CliConfig, LocalStorage, ReportEngine, StoryPipeline};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    let mut config = ReportConfig::from_file(&args.config)
        .with_context(|| format!("failed to load report definition '{}'", args.config))?;
    args.apply_overrides(&mut config);

    logger::init_logger(config.log_format(), args.verbose);

    tracing::info!("🚀 Starting transfer-story");
    tracing::info!("📁 Report definition: {}", args.config);
    if args.verbose {
        tracing::debug!("CLI config: {:?}", args);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no data will be read");
        perform_dry_run(&config);
        return Ok(());
    }

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let source = LocalStorage::new(config.data_dir());
    let sink = LocalStorage::new(config.output_path());
    let pipeline = StoryPipeline::new(source, sink, config);
    let engine = ReportEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Report rendered successfully!");
            println!("✅ Report rendered successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Report run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &ReportConfig, args: &CliConfig) {
    println!("📋 Report Summary:");
    match &config.report.version {
        Some(version) => println!("  Report: {} v{}", config.report.title, version),
        None => println!("  Report: {}", config.report.title),
    }
    println!("  Data dir: {}", config.data_dir());
    println!("  Transfer files: {}", config.sources.transfers.len());
    println!("  Match files: {}", config.sources.matches.len());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.load.output_formats.join(", "));
    println!("  Sections: {}", config.sections.len());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &ReportConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📡 Sources:");
    for file in config.sources.transfers.iter().chain(&config.sources.matches) {
        println!("  {}/{}", config.data_dir(), file);
    }
    if let Some(mapping) = &config.sources.field_mapping {
        for (from, to) in mapping {
            println!("  {} -> {}", from, to);
        }
    }

    println!();
    println!("⚙️ Selection:");
    match &config.timespan {
        Some(span) => println!(
            "  Timespan: {} - {}",
            span.from_year.map_or("data start".to_string(), |y| y.to_string()),
            span.to_year.map_or("data end".to_string(), |y| y.to_string())
        ),
        None => println!("  Timespan: full data range"),
    }
    println!("  Top N: {}", config.thresholds.top_n);
    println!("  High-value fee: > {}m", config.thresholds.high_value_fee);

    println!();
    println!("📊 Sections:");
    for section in &config.sections {
        let shape = match &section.chart {
            Some(ChartDefinition::Aggregate(c)) => {
                format!("{:?} by {}", c.kind, c.group_by.join(" > "))
            }
            Some(ChartDefinition::Points(c)) => format!("{:?} {} vs {}", c.kind, c.x, c.y),
            None => "narrative only".to_string(),
        };
        println!(
            "  {} [{:?}] {} ({} filters)",
            section.id,
            section.dataset,
            shape,
            section.filters.len()
        );
    }

    if let Some(bundle) = config.bundle_name() {
        println!();
        println!("💾 Compression: {} (ZIP)", bundle);
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
