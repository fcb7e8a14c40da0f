use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing column '{column}' in {table}")]
    MissingColumnError { column: String, table: String },

    #[error("Cannot parse {field} value '{value}'{}: {reason}", line_suffix(.line))]
    ParseError {
        field: String,
        value: String,
        line: Option<u64>,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

fn line_suffix(line: &Option<u64>) -> String {
    match line {
        Some(line) => format!(" on line {}", line),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Data,
    Output,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReportError {
    pub fn parse(field: &str, value: &str, reason: impl Into<String>) -> Self {
        ReportError::ParseError {
            field: field.to_string(),
            value: value.to_string(),
            line: None,
            reason: reason.into(),
        }
    }

    pub fn missing_column(column: &str, table: &str) -> Self {
        ReportError::MissingColumnError {
            column: column.to_string(),
            table: table.to_string(),
        }
    }

    /// Attaches a CSV line number to a parse error; other errors pass through.
    pub fn at_line(self, at: u64) -> Self {
        match self {
            ReportError::ParseError {
                field,
                value,
                reason,
                ..
            } => ReportError::ParseError {
                field,
                value,
                line: Some(at),
                reason,
            },
            other => other,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ReportError::ConfigValidationError { .. }
            | ReportError::InvalidConfigValueError { .. }
            | ReportError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ReportError::MissingColumnError { .. }
            | ReportError::ParseError { .. }
            | ReportError::CsvError(_) => ErrorCategory::Data,
            ReportError::ZipError(_) | ReportError::SerializationError(_) => ErrorCategory::Output,
            ReportError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Output => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ReportError::MissingColumnError { column, .. } => format!(
                "Add a '{}' column to the file or map its header with [sources.field_mapping]",
                column
            ),
            ReportError::ParseError { field, .. } => {
                format!("Fix the malformed '{}' value in the source data", field)
            }
            ReportError::CsvError(_) => {
                "Check that the file is valid CSV with a header row".to_string()
            }
            ReportError::IoError(_) => {
                "Check that the data directory exists and the output path is writable".to_string()
            }
            ReportError::ConfigValidationError { .. }
            | ReportError::InvalidConfigValueError { .. }
            | ReportError::MissingConfigError { .. } => {
                "Review the report definition file".to_string()
            }
            ReportError::SerializationError(_) | ReportError::ZipError(_) => {
                "Retry with fewer output formats or compression disabled".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid report definition: {}", self),
            ErrorCategory::Data => format!("Input data problem: {}", self),
            ErrorCategory::Output => format!("Could not write the report: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
