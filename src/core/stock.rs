//! 庫存狀態正規化
//!
//! 規則表每一筆是 `(pattern, MatchMode, StockStatus)`。比對分三輪：
//! 完全相等、子字串、單字邊界。子字串與單字邊界兩輪內，缺貨規則一律先於
//! 有貨規則，否則 "not in stock" 會被較短的 "in stock" 判成有貨。
//! 自訂規則整組先於內建規則比對。

use crate::domain::model::{NormalizationStats, StockStatus};
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// 只接受完全相等（避免 "no"、"1" 這類短字誤中）
    Exact,
    /// 完全相等或包含於輸入中，適合沒有空白分詞的泰文
    Substring,
    /// 完全相等或以單字邊界出現在輸入中
    WordBoundary,
}

#[derive(Debug, Clone)]
struct PatternRule {
    pattern: String,
    mode: MatchMode,
    status: StockStatus,
    boundary: Option<Regex>,
}

impl PatternRule {
    fn new(pattern: &str, mode: MatchMode, status: StockStatus) -> Result<Self> {
        let pattern = clean_status(pattern);
        if pattern.is_empty() {
            return Err(EtlError::InvalidConfigValueError {
                field: "stock_patterns".to_string(),
                value: pattern,
                reason: "Stock pattern cannot be empty".to_string(),
            });
        }

        let boundary = match mode {
            MatchMode::WordBoundary => Some(
                Regex::new(&format!(r"\b{}\b", regex::escape(&pattern))).map_err(|e| {
                    EtlError::InvalidConfigValueError {
                        field: "stock_patterns".to_string(),
                        value: pattern.clone(),
                        reason: format!("Cannot build word-boundary matcher: {}", e),
                    }
                })?,
            ),
            _ => None,
        };

        Ok(Self {
            pattern,
            mode,
            status,
            boundary,
        })
    }
}

use MatchMode::{Exact, Substring, WordBoundary};
use StockStatus::{InStock, OutOfStock};

// 缺貨規則排在前面，完全相等時依表格順序
const BUILTIN_RULES: &[(&str, MatchMode, StockStatus)] = &[
    // English, out of stock
    ("out of stock", WordBoundary, OutOfStock),
    ("out-of-stock", WordBoundary, OutOfStock),
    ("outofstock", WordBoundary, OutOfStock),
    ("sold out", WordBoundary, OutOfStock),
    ("not available", WordBoundary, OutOfStock),
    ("no longer available", WordBoundary, OutOfStock),
    ("not in stock", WordBoundary, OutOfStock),
    ("not in-stock", WordBoundary, OutOfStock),
    ("unavailable", WordBoundary, OutOfStock),
    ("temporarily unavailable", WordBoundary, OutOfStock),
    ("no stock", WordBoundary, OutOfStock),
    ("depleted", WordBoundary, OutOfStock),
    ("exhausted", WordBoundary, OutOfStock),
    ("empty", Exact, OutOfStock),
    ("no", Exact, OutOfStock),
    ("false", Exact, OutOfStock),
    ("0", Exact, OutOfStock),
    // ภาษาไทย, out of stock
    ("หมด", Substring, OutOfStock),
    ("สินค้าหมด", Substring, OutOfStock),
    ("ไม่มีสินค้า", Substring, OutOfStock),
    ("ไม่มีของ", Substring, OutOfStock),
    ("ไม่มีสต็อก", Substring, OutOfStock),
    ("สต็อกหมด", Substring, OutOfStock),
    ("ขายหมด", Substring, OutOfStock),
    ("ไม่พร้อมส่ง", Substring, OutOfStock),
    ("ไม่มีในสต็อก", Substring, OutOfStock),
    ("สินค้าไม่พร้อม", Substring, OutOfStock),
    ("ชั่วคราวหมด", Substring, OutOfStock),
    ("สินค้าหมดชั่วคราว", Substring, OutOfStock),
    ("ไม่มีสินค้าในขณะนี้", Substring, OutOfStock),
    // English, in stock
    ("in stock", WordBoundary, InStock),
    ("in-stock", WordBoundary, InStock),
    ("instock", WordBoundary, InStock),
    ("available", WordBoundary, InStock),
    ("available now", WordBoundary, InStock),
    ("ready to ship", WordBoundary, InStock),
    ("ready now", WordBoundary, InStock),
    ("on hand", WordBoundary, InStock),
    ("stocked", WordBoundary, InStock),
    ("inventory available", WordBoundary, InStock),
    ("ready", Exact, InStock),
    ("yes", Exact, InStock),
    ("true", Exact, InStock),
    ("1", Exact, InStock),
    // ภาษาไทย, in stock
    ("มีสินค้า", Substring, InStock),
    ("พร้อมส่ง", Substring, InStock),
    ("มีของ", Substring, InStock),
    ("มีสต็อก", Substring, InStock),
    ("พร้อมจัดส่ง", Substring, InStock),
    ("มีในสต็อก", Substring, InStock),
    ("สินค้าพร้อม", Substring, InStock),
    ("พร้อมขาย", Substring, InStock),
    ("มีจำหน่าย", Substring, InStock),
    ("สินค้ามี", Substring, InStock),
    ("พร้อมทันที", Substring, InStock),
    ("มีสินค้าพร้อมส่ง", Substring, InStock),
    ("สินค้าพร้อมจัดส่ง", Substring, InStock),
];

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.,!?;:]").expect("punctuation pattern is valid"));

/// 小寫、去除標點並壓縮空白
fn clean_status(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone)]
pub struct StockStatusNormalizer {
    custom: Vec<PatternRule>,
    builtin: Vec<PatternRule>,
}

impl Default for StockStatusNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl StockStatusNormalizer {
    pub fn new() -> Self {
        let builtin = BUILTIN_RULES
            .iter()
            .filter_map(|(pattern, mode, status)| PatternRule::new(pattern, *mode, *status).ok())
            .collect();
        Self {
            custom: Vec::new(),
            builtin,
        }
    }

    /// 以設定檔中的自訂規則建立；自訂規則一律使用子字串比對
    pub fn with_custom_patterns(in_stock: &[String], out_of_stock: &[String]) -> Result<Self> {
        let mut normalizer = Self::new();
        for pattern in out_of_stock {
            normalizer.add_custom_pattern(pattern, Substring, OutOfStock)?;
        }
        for pattern in in_stock {
            normalizer.add_custom_pattern(pattern, Substring, InStock)?;
        }
        Ok(normalizer)
    }

    pub fn add_custom_pattern(
        &mut self,
        pattern: &str,
        mode: MatchMode,
        status: StockStatus,
    ) -> Result<()> {
        let rule = PatternRule::new(pattern, mode, status)?;
        tracing::debug!(
            "➕ Custom stock pattern '{}' ({:?}) -> {}",
            rule.pattern,
            mode,
            status
        );
        self.custom.push(rule);
        Ok(())
    }

    pub fn custom_pattern_count(&self) -> usize {
        self.custom.len()
    }

    /// 無法辨識時回傳 `Unknown`，永不失敗
    pub fn normalize(&self, raw: Option<&str>) -> StockStatus {
        let Some(raw) = raw else {
            return StockStatus::Unknown;
        };
        let cleaned = clean_status(raw);
        if cleaned.is_empty() {
            return StockStatus::Unknown;
        }

        let status = Self::match_rules(&self.custom, &cleaned)
            .or_else(|| Self::match_rules(&self.builtin, &cleaned))
            .unwrap_or(StockStatus::Unknown);

        if status == StockStatus::Unknown {
            tracing::debug!("❓ Unknown stock status text: '{}'", raw);
        }
        status
    }

    /// 正規化並記入統計
    pub fn normalize_tracked(&self, raw: Option<&str>, stats: &mut NormalizationStats) -> StockStatus {
        let status = self.normalize(raw);
        stats.record(raw, status);
        status
    }

    fn match_rules(rules: &[PatternRule], cleaned: &str) -> Option<StockStatus> {
        if let Some(rule) = rules.iter().find(|r| r.pattern == cleaned) {
            return Some(rule.status);
        }

        Self::match_pass(rules, |r| {
            r.mode == Substring && cleaned.contains(r.pattern.as_str())
        })
        .or_else(|| {
            Self::match_pass(rules, |r| {
                r.boundary
                    .as_ref()
                    .map(|re| re.is_match(cleaned))
                    .unwrap_or(false)
            })
        })
    }

    fn match_pass(rules: &[PatternRule], hit: impl Fn(&PatternRule) -> bool) -> Option<StockStatus> {
        [OutOfStock, InStock]
            .into_iter()
            .find(|status| rules.iter().any(|r| r.status == *status && hit(r)))
    }
}
