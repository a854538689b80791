use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 原始價格值：JSON 中可能是字串或數字
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Number(f64),
    Text(String),
}

impl fmt::Display for RawPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawPrice::Number(n) => write!(f, "{}", n),
            RawPrice::Text(s) => write!(f, "{}", s),
        }
    }
}

/// 抽取器產出的未驗證商品資料
///
/// `fragment` 保留原始 JSON 片段供除錯，不參與任何驗證邏輯。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price_raw: Option<RawPrice>,
    pub stock_raw: Option<String>,
    pub source_document: String,
    pub fragment: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl StockStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 通過驗證的商品，只能由 `ProductTransformer` 建立
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub(crate) name: String,
    pub(crate) sku: String,
    pub(crate) price: f64,
    pub(crate) stock_status: StockStatus,
    pub(crate) source: String,
}

impl Product {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn stock_status(&self) -> StockStatus {
        self.stock_status
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    File,
    Extraction,
    Validation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEntry {
    pub kind: ErrorKind,
    pub context: String,
    pub message: String,
}

/// 庫存狀態正規化的統計
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizationStats {
    pub total_normalized: usize,
    pub in_stock: usize,
    pub out_of_stock: usize,
    pub unknown: usize,
    /// 每個原始文字第一次對應到的狀態
    pub pattern_matches: BTreeMap<String, StockStatus>,
}

impl NormalizationStats {
    pub fn record(&mut self, raw: Option<&str>, status: StockStatus) {
        self.total_normalized += 1;
        match status {
            StockStatus::InStock => self.in_stock += 1,
            StockStatus::OutOfStock => self.out_of_stock += 1,
            StockStatus::Unknown => self.unknown += 1,
        }
        if let Some(raw) = raw {
            self.pattern_matches
                .entry(raw.to_string())
                .or_insert(status);
        }
    }

    pub fn merge(&mut self, other: NormalizationStats) {
        self.total_normalized += other.total_normalized;
        self.in_stock += other.in_stock;
        self.out_of_stock += other.out_of_stock;
        self.unknown += other.unknown;
        for (raw, status) in other.pattern_matches {
            self.pattern_matches.entry(raw).or_insert(status);
        }
    }

    /// 成功對應到已知狀態的百分比
    pub fn success_rate(&self) -> f64 {
        percentage(self.in_stock + self.out_of_stock, self.total_normalized)
    }
}

/// 單次批次執行的統計，每次執行都重新建立
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchStatistics {
    pub files_processed: usize,
    pub files_failed: usize,
    pub records_extracted: usize,
    pub records_validated: usize,
    pub records_rejected: usize,
    pub duplicates_removed: usize,
    pub errors: Vec<ErrorEntry>,
    pub stock_normalization: NormalizationStats,
    pub started_at: Option<DateTime<Local>>,
}

impl BatchStatistics {
    pub fn new() -> Self {
        Self {
            started_at: Some(Local::now()),
            ..Default::default()
        }
    }

    pub fn record_error(
        &mut self,
        kind: ErrorKind,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.errors.push(ErrorEntry {
            kind,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ErrorEntry> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    pub fn file_success_rate(&self) -> f64 {
        percentage(
            self.files_processed,
            self.files_processed + self.files_failed,
        )
    }

    pub fn validation_success_rate(&self) -> f64 {
        percentage(
            self.records_validated,
            self.records_validated + self.records_rejected,
        )
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// 同一 SKU 出現多次時保留哪一筆
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    FirstSeen,
    #[default]
    LastSeen,
}

/// 批次轉換結果
#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub products: Vec<Product>,
    pub errors: Vec<crate::utils::error::TransformError>,
    pub stock_stats: NormalizationStats,
}

/// 寫在 CSV 旁的摘要報告
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingSummary {
    pub files_processed: usize,
    pub files_failed: usize,
    pub records_extracted: usize,
    pub records_validated: usize,
    pub records_rejected: usize,
    pub duplicates_removed: usize,
    pub products_exported: usize,
    pub file_success_rate: f64,
    pub validation_success_rate: f64,
    pub stock_normalization: NormalizationStats,
    pub errors: Vec<ErrorEntry>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub output_file: String,
}

impl ProcessingSummary {
    pub fn from_stats(
        stats: &BatchStatistics,
        products_exported: usize,
        output_file: impl Into<String>,
    ) -> Self {
        Self {
            files_processed: stats.files_processed,
            files_failed: stats.files_failed,
            records_extracted: stats.records_extracted,
            records_validated: stats.records_validated,
            records_rejected: stats.records_rejected,
            duplicates_removed: stats.duplicates_removed,
            products_exported,
            file_success_rate: stats.file_success_rate(),
            validation_success_rate: stats.validation_success_rate(),
            stock_normalization: stats.stock_normalization.clone(),
            errors: stats.errors.clone(),
            started_at: stats.started_at.unwrap_or_else(Local::now),
            finished_at: Local::now(),
            output_file: output_file.into(),
        }
    }
}
