use crate::config::{
    DEFAULT_CSV_FILENAME, DEFAULT_INPUT_DIRECTORY, DEFAULT_MAX_FILE_SIZE_MB,
    DEFAULT_OUTPUT_DIRECTORY,
};
use crate::core::ConfigProvider;
use crate::domain::model::DedupPolicy;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub stock: StockConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub input_directory: String,
    pub output_directory: String,
    /// `{date}` 會替換成執行當天日期
    pub csv_filename: String,
    pub max_file_size_mb: u64,
    pub dedup_policy: DedupPolicy,
    pub utf8_bom: bool,
    pub write_summary: bool,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            input_directory: DEFAULT_INPUT_DIRECTORY.to_string(),
            output_directory: DEFAULT_OUTPUT_DIRECTORY.to_string(),
            csv_filename: DEFAULT_CSV_FILENAME.to_string(),
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            dedup_policy: DedupPolicy::default(),
            utf8_bom: true,
            write_summary: true,
        }
    }
}

/// 網站特有的庫存文字，優先於內建規則
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StockConfig {
    pub in_stock_patterns: Vec<String>,
    pub out_of_stock_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RAW_DATA_DIR})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }

    /// 命令列有明確指定的值覆蓋檔案設定
    #[cfg(feature = "cli")]
    pub fn apply_cli_overrides(&mut self, cli: &crate::config::CliConfig) {
        let producer = &mut self.producer;
        if let Some(dir) = &cli.input_directory {
            producer.input_directory = dir.clone();
        }
        if let Some(dir) = &cli.output_directory {
            producer.output_directory = dir.clone();
        }
        if let Some(name) = &cli.csv_filename {
            producer.csv_filename = name.clone();
        }
        if let Some(mb) = cli.max_file_size_mb {
            producer.max_file_size_mb = mb;
        }
        if let Some(policy) = cli.dedup {
            producer.dedup_policy = policy;
        }
        if cli.no_bom {
            producer.utf8_bom = false;
        }
        if cli.no_summary {
            producer.write_summary = false;
        }
        self.stock
            .in_stock_patterns
            .extend(cli.in_stock_pattern.iter().cloned());
        self.stock
            .out_of_stock_patterns
            .extend(cli.out_of_stock_pattern.iter().cloned());
        if cli.monitor {
            let monitoring = self.monitoring.get_or_insert(MonitoringConfig {
                enabled: true,
                log_format: None,
            });
            monitoring.enabled = true;
        }
    }
}

impl ConfigProvider for TomlConfig {
    fn input_directory(&self) -> &str {
        &self.producer.input_directory
    }

    fn output_directory(&self) -> &str {
        &self.producer.output_directory
    }

    fn csv_filename(&self) -> &str {
        &self.producer.csv_filename
    }

    fn max_file_size_bytes(&self) -> u64 {
        self.producer.max_file_size_mb * 1024 * 1024
    }

    fn dedup_policy(&self) -> DedupPolicy {
        self.producer.dedup_policy
    }

    fn utf8_bom(&self) -> bool {
        self.producer.utf8_bom
    }

    fn write_summary(&self) -> bool {
        self.producer.write_summary
    }

    fn in_stock_patterns(&self) -> &[String] {
        &self.stock.in_stock_patterns
    }

    fn out_of_stock_patterns(&self) -> &[String] {
        &self.stock.out_of_stock_patterns
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        let producer = &self.producer;
        validation::validate_path("producer.input_directory", &producer.input_directory)?;
        validation::validate_path("producer.output_directory", &producer.output_directory)?;
        validation::validate_filename_template("producer.csv_filename", &producer.csv_filename)?;
        validation::validate_range("producer.max_file_size_mb", producer.max_file_size_mb, 1, 1024)?;

        for pattern in self
            .stock
            .in_stock_patterns
            .iter()
            .chain(&self.stock.out_of_stock_patterns)
        {
            validation::validate_non_empty_string("stock.patterns", pattern)?;
        }

        if let Some(format) = self.monitoring.as_ref().and_then(|m| m.log_format.as_deref()) {
            if !["compact", "json"].contains(&format.to_lowercase().as_str()) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "monitoring.log_format".to_string(),
                    value: format.to_string(),
                    reason: "Supported formats: compact, json".to_string(),
                });
            }
        }

        Ok(())
    }
}
