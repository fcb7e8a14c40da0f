use crate::core::aggregate::{Measure, Predicate, SortOrder};
use crate::domain::model::DatasetKind;
use crate::domain::report::{ChartKind, Timespan};
use crate::utils::error::{ReportError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_HIGH_VALUE_FEE: f64 = 50.0;

const OUTPUT_FORMATS: [&str; 2] = ["json", "csv"];

/// A report definition: where the data lives and which sections to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub report: ReportInfo,
    pub sources: SourceConfig,
    pub timespan: Option<TimespanConfig>,
    #[serde(default)]
    pub thresholds: Thresholds,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
    #[serde(default)]
    pub sections: Vec<SectionDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportInfo {
    pub title: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub transfers: Vec<String>,
    #[serde(default)]
    pub matches: Vec<String>,
    /// Source header -> canonical column name.
    pub field_mapping: Option<HashMap<String, String>>,
}

fn default_data_dir() -> String {
    "data".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimespanConfig {
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_high_value_fee")]
    pub high_value_fee: f64,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_high_value_fee() -> f64 {
    DEFAULT_HIGH_VALUE_FEE
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            high_value_fee: DEFAULT_HIGH_VALUE_FEE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    /// "compact" (default) or "json".
    pub log_format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDefinition {
    pub id: String,
    pub heading: String,
    #[serde(default)]
    pub narrative: String,
    #[serde(default)]
    pub dataset: DatasetKind,
    #[serde(default)]
    pub filters: Vec<FilterDefinition>,
    /// Narrative-only when absent.
    pub chart: Option<ChartDefinition>,
}

/// A filter entry: either an explicit predicate or a named shortcut bound
/// to the `[thresholds]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterDefinition {
    Predicate(Predicate),
    Named(NamedFilter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NamedFilter {
    /// `fee_cleaned > thresholds.high_value_fee`
    HighValueFee,
}

impl FilterDefinition {
    pub fn resolve(&self, thresholds: &Thresholds) -> Predicate {
        match self {
            FilterDefinition::Predicate(p) => p.clone(),
            FilterDefinition::Named(NamedFilter::HighValueFee) => Predicate::GreaterThan {
                field: "fee_cleaned".to_string(),
                threshold: thresholds.high_value_fee,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartDefinition {
    Aggregate(AggregateChart),
    Points(PointsChart),
}

impl ChartDefinition {
    pub fn title(&self) -> &str {
        match self {
            ChartDefinition::Aggregate(c) => &c.title,
            ChartDefinition::Points(c) => &c.title,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateChart {
    #[serde(default = "default_aggregate_kind")]
    pub kind: ChartKind,
    pub title: String,
    pub group_by: Vec<String>,
    pub measure: Measure,
    #[serde(default)]
    pub order: SortOrder,
    pub top_n: Option<TopN>,
    /// Order the x axis by season/year instead of by total.
    #[serde(default)]
    pub chronological: bool,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

fn default_aggregate_kind() -> ChartKind {
    ChartKind::Bar
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopN {
    pub partition: String,
    /// Falls back to `thresholds.top_n`.
    pub n: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsChart {
    #[serde(default = "default_points_kind")]
    pub kind: ChartKind,
    pub title: String,
    pub x: String,
    pub y: String,
    pub color: Option<String>,
    #[serde(default)]
    pub hover: Vec<String>,
    pub sort_by: Option<String>,
    pub category_order: Option<Vec<String>>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

fn default_points_kind() -> ChartKind {
    ChartKind::Scatter
}

impl ReportConfig {
    /// 從 TOML 檔案載入報告定義
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReportError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ReportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR}); unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ReportError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("report.title", &self.report.title)?;

        validation::validate_path("sources.data_dir", &self.sources.data_dir)?;
        validation::validate_file_extensions(
            "sources.transfers",
            &self.sources.transfers,
            &["csv"],
        )?;
        validation::validate_file_extensions("sources.matches", &self.sources.matches, &["csv"])?;
        if self.sources.transfers.is_empty() && self.sources.matches.is_empty() {
            return Err(ReportError::MissingConfigError {
                field: "sources.transfers".to_string(),
            });
        }

        if let Some(TimespanConfig {
            from_year: Some(from),
            to_year: Some(to),
        }) = &self.timespan
        {
            validation::validate_ordered("timespan", from, to)?;
        }

        validation::validate_positive_number("thresholds.top_n", self.thresholds.top_n, 1)?;
        if !self.thresholds.high_value_fee.is_finite() {
            return Err(ReportError::InvalidConfigValueError {
                field: "thresholds.high_value_fee".to_string(),
                value: self.thresholds.high_value_fee.to_string(),
                reason: "Threshold must be a finite number".to_string(),
            });
        }

        validation::validate_path("load.output_path", &self.load.output_path)?;
        if self.load.output_formats.is_empty() {
            return Err(ReportError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }
        for format in &self.load.output_formats {
            if !OUTPUT_FORMATS.contains(&format.as_str()) {
                return Err(ReportError::InvalidConfigValueError {
                    field: "load.output_formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        OUTPUT_FORMATS.join(", ")
                    ),
                });
            }
        }
        if let Some(compression) = &self.load.compression {
            if compression.enabled {
                validation::validate_file_extensions(
                    "load.compression.filename",
                    std::slice::from_ref(&compression.filename),
                    &["zip"],
                )?;
            }
        }

        validation::validate_unique("sections.id", self.sections.iter().map(|s| s.id.as_str()))?;
        for section in &self.sections {
            self.validate_section(section)?;
        }

        Ok(())
    }

    fn validate_section(&self, section: &SectionDefinition) -> Result<()> {
        let id_ok = !section.id.is_empty()
            && section
                .id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !id_ok {
            return Err(ReportError::InvalidConfigValueError {
                field: "sections.id".to_string(),
                value: section.id.clone(),
                reason: "Use letters, digits, '-' or '_' only".to_string(),
            });
        }

        let needs_matches = matches!(
            section.dataset,
            DatasetKind::Matches | DatasetKind::TeamMatches
        );
        if needs_matches && self.sources.matches.is_empty() {
            return Err(ReportError::MissingConfigError {
                field: format!("sources.matches (used by section '{}')", section.id),
            });
        }

        if let Some(ChartDefinition::Aggregate(chart)) = &section.chart {
            if chart.group_by.is_empty() {
                return Err(ReportError::MissingConfigError {
                    field: format!("sections.{}.chart.group_by", section.id),
                });
            }
            if let Some(top_n) = &chart.top_n {
                if !chart.group_by.contains(&top_n.partition) {
                    return Err(ReportError::InvalidConfigValueError {
                        field: format!("sections.{}.chart.top_n.partition", section.id),
                        value: top_n.partition.clone(),
                        reason: "Partition must be one of the group_by keys".to_string(),
                    });
                }
                if let Some(n) = top_n.n {
                    validation::validate_positive_number(
                        &format!("sections.{}.chart.top_n.n", section.id),
                        n,
                        1,
                    )?;
                }
            }
        }

        Ok(())
    }

    pub fn data_dir(&self) -> &str {
        &self.sources.data_dir
    }

    pub fn output_path(&self) -> &str {
        &self.load.output_path
    }

    pub fn wants_format(&self, format: &str) -> bool {
        self.load.output_formats.iter().any(|f| f == format)
    }

    /// ZIP bundle file name, when compression is enabled.
    pub fn bundle_name(&self) -> Option<&str> {
        self.load
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_str())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_name(self.monitoring.as_ref().and_then(|m| m.log_format.as_deref()))
    }

    /// Configured bounds layered over the data's own year range. Fails when a
    /// single configured bound lands past the other end of the data.
    pub fn resolve_timespan(&self, data_bounds: Option<Timespan>) -> Result<Option<Timespan>> {
        let configured = self.timespan.clone().unwrap_or_default();
        let span = match (data_bounds, configured.from_year, configured.to_year) {
            (None, Some(from), Some(to)) => Timespan {
                from_year: from,
                to_year: to,
            },
            (None, _, _) => return Ok(None),
            (Some(bounds), from, to) => Timespan {
                from_year: from.unwrap_or(bounds.from_year),
                to_year: to.unwrap_or(bounds.to_year),
            },
        };
        validation::validate_ordered("timespan", &span.from_year, &span.to_year)?;
        Ok(Some(span))
    }
}

impl Validate for ReportConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
