#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::domain::model::DedupPolicy;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

pub const DEFAULT_INPUT_DIRECTORY: &str = "raw_data/search_results";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "output";
pub const DEFAULT_CSV_FILENAME: &str = "competitor_prices_{date}.csv";
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 100;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// 未指定的選項使用預設值；搭配 `--config` 時只有明確指定的選項會覆蓋檔案設定
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "price-report-etl")]
#[command(about = "Turns raw product JSON captures into a validated, deduplicated CSV price report")]
pub struct CliConfig {
    #[arg(short, long, help = "Directory of raw JSON captures [default: raw_data/search_results]")]
    pub input_directory: Option<String>,

    #[arg(short, long, help = "Directory for the CSV report [default: output]")]
    pub output_directory: Option<String>,

    #[arg(long, help = "Report file name, {date} becomes YYYY-MM-DD [default: competitor_prices_{date}.csv]")]
    pub csv_filename: Option<String>,

    #[arg(long, help = "Skip input files larger than this many MB [default: 100]")]
    pub max_file_size_mb: Option<u64>,

    #[arg(long, value_enum, help = "Which record survives when a SKU repeats [default: last-seen]")]
    pub dedup: Option<DedupPolicy>,

    #[arg(long, help = "Write the CSV without a UTF-8 byte order mark")]
    pub no_bom: bool,

    #[arg(long, help = "Do not write the JSON summary next to the CSV")]
    pub no_summary: bool,

    #[arg(long, value_delimiter = ',', help = "Extra text meaning in stock")]
    pub in_stock_pattern: Vec<String>,

    #[arg(long, value_delimiter = ',', help = "Extra text meaning out of stock")]
    pub out_of_stock_pattern: Vec<String>,

    #[arg(short, long, help = "TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[arg(long, help = "List the files that would be read and exit")]
    pub dry_run: bool,

    #[arg(long, help = "Log process CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_directory(&self) -> &str {
        self.input_directory
            .as_deref()
            .unwrap_or(DEFAULT_INPUT_DIRECTORY)
    }

    fn output_directory(&self) -> &str {
        self.output_directory
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_DIRECTORY)
    }

    fn csv_filename(&self) -> &str {
        self.csv_filename.as_deref().unwrap_or(DEFAULT_CSV_FILENAME)
    }

    fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.unwrap_or(DEFAULT_MAX_FILE_SIZE_MB) * 1024 * 1024
    }

    fn dedup_policy(&self) -> DedupPolicy {
        self.dedup.unwrap_or_default()
    }

    fn utf8_bom(&self) -> bool {
        !self.no_bom
    }

    fn write_summary(&self) -> bool {
        !self.no_summary
    }

    fn in_stock_patterns(&self) -> &[String] {
        &self.in_stock_pattern
    }

    fn out_of_stock_patterns(&self) -> &[String] {
        &self.out_of_stock_pattern
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input_directory", self.input_directory())?;
        validation::validate_path("output_directory", self.output_directory())?;
        validation::validate_filename_template("csv_filename", self.csv_filename())?;
        if let Some(mb) = self.max_file_size_mb {
            validation::validate_range("max_file_size_mb", mb, 1, 1024)?;
        }
        for pattern in self.in_stock_pattern.iter().chain(&self.out_of_stock_pattern) {
            validation::validate_non_empty_string("stock pattern", pattern)?;
        }
        if let Some(path) = &self.config {
            validation::validate_path("config", path)?;
        }
        Ok(())
    }
}
