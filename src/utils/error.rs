use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Input directory not found or unreadable: {path}")]
    InputNotFound { path: String },

    #[error("No input file could be processed in {directory} ({files_failed} failed)")]
    NoFilesProcessed { directory: String, files_failed: usize },

    #[error("No valid products after validation ({files_processed} files processed, {records_rejected} records rejected)")]
    NoValidProducts {
        files_processed: usize,
        records_rejected: usize,
    },

    #[error("Export to {path} failed: {message}")]
    ExportError { path: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Processing,
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

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigValidationError { .. } | EtlError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            EtlError::InputNotFound { .. } | EtlError::NoFilesProcessed { .. } => {
                ErrorCategory::Input
            }
            EtlError::NoValidProducts { .. }
            | EtlError::ProcessingError { .. }
            | EtlError::SerializationError(_) => ErrorCategory::Processing,
            EtlError::ExportError { .. } | EtlError::CsvError(_) => ErrorCategory::Output,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            // 輸入資料不足通常是蒐集端的問題，重新蒐集後可重試
            ErrorCategory::Input | ErrorCategory::Processing => ErrorSeverity::Medium,
            ErrorCategory::Output => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ConfigValidationError { .. } | EtlError::InvalidConfigValueError { .. } => {
                "Check the configuration file and command line flags"
            }
            EtlError::InputNotFound { .. } => {
                "Make sure the input directory exists and is readable"
            }
            EtlError::NoFilesProcessed { .. } => {
                "Re-collect the raw JSON captures; every input file was unreadable or malformed"
            }
            EtlError::NoValidProducts { .. } => {
                "Inspect the listed errors; every extracted record was rejected"
            }
            EtlError::ExportError { .. } | EtlError::CsvError(_) => {
                "Check free disk space and write permission on the output directory"
            }
            EtlError::SerializationError(_) | EtlError::ProcessingError { .. } => {
                "Re-run with --verbose to see which record caused the failure"
            }
            EtlError::IoError(_) => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::NoFilesProcessed { directory, .. } => {
                format!("No usable JSON files were found in {}", directory)
            }
            EtlError::NoValidProducts { .. } => {
                "All products were rejected; no report was written".to_string()
            }
            EtlError::ExportError { path, .. } => {
                format!("The CSV report at {} could not be written or verified", path)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

/// 價格字串轉換失敗的原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriceError {
    #[error("price is empty")]
    Missing,

    #[error("price '{raw}' is empty after cleaning")]
    EmptyAfterCleaning { raw: String },

    #[error("cannot convert price '{raw}' to a number")]
    Unparseable { raw: String },
}

/// 錯誤訊息中用來定位單筆紀錄的資訊
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordContext {
    pub document: String,
    pub sku: Option<String>,
    pub name: Option<String>,
}

impl fmt::Display for RecordContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.document)?;
        if let Some(sku) = &self.sku {
            write!(f, " sku={}", sku)?;
        }
        if let Some(name) = &self.name {
            write!(f, " name=\"{}\"", name)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("missing product name [{context}]")]
    MissingName { context: RecordContext },

    #[error("invalid SKU: {reason} [{context}]")]
    InvalidSku {
        context: RecordContext,
        reason: String,
    },

    #[error("invalid price: {source} [{context}]")]
    InvalidPrice {
        context: RecordContext,
        source: PriceError,
    },

    #[error("validation failed for {field}: {reason} [{context}]")]
    ValidationError {
        context: RecordContext,
        field: &'static str,
        reason: String,
    },
}

impl TransformError {
    pub fn context(&self) -> &RecordContext {
        match self {
            TransformError::MissingName { context }
            | TransformError::InvalidSku { context, .. }
            | TransformError::InvalidPrice { context, .. }
            | TransformError::ValidationError { context, .. } => context,
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            TransformError::MissingName { .. } => "name",
            TransformError::InvalidSku { .. } => "sku",
            TransformError::InvalidPrice { .. } => "price",
            TransformError::ValidationError { field, .. } => *field,
        }
    }

    /// 不含紀錄位置的錯誤描述
    pub fn reason(&self) -> String {
        match self {
            TransformError::MissingName { .. } => "missing product name".to_string(),
            TransformError::InvalidSku { reason, .. } => format!("invalid SKU: {}", reason),
            TransformError::InvalidPrice { source, .. } => format!("invalid price: {}", source),
            TransformError::ValidationError { field, reason, .. } => {
                format!("validation failed for {}: {}", field, reason)
            }
        }
    }
}

/// 單一商品項目抽取失敗
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{document}{}: {reason}", .index.map(|i| format!("#{}", i)).unwrap_or_default())]
pub struct ExtractionError {
    pub document: String,
    pub index: Option<usize>,
    pub reason: String,
}
