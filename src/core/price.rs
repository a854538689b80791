//! 價格字串轉換：只做語法層面的清理與數值轉換。
//!
//! 負數不在這裡拒絕，商業規則由 `ProductTransformer` 負責。

use crate::domain::model::RawPrice;
use crate::utils::error::PriceError;
use regex::Regex;
use std::sync::LazyLock;

// 貨幣符號（Unicode Sc 類別）、THB / Baht / บาท 後綴、千分位逗號與所有空白
static CURRENCY_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\p{Sc}|thb|baht|บาท|,|\s").expect("currency pattern is valid")
});

pub fn parse_price(raw: Option<&RawPrice>) -> Result<f64, PriceError> {
    match raw {
        None => Err(PriceError::Missing),
        Some(RawPrice::Number(n)) => Ok(*n),
        Some(RawPrice::Text(s)) => parse_price_str(s),
    }
}

pub fn parse_price_str(raw: &str) -> Result<f64, PriceError> {
    if raw.trim().is_empty() {
        return Err(PriceError::Missing);
    }

    let cleaned = keep_last_decimal_point(&CURRENCY_NOISE.replace_all(raw, ""));
    if cleaned.is_empty() {
        return Err(PriceError::EmptyAfterCleaning {
            raw: raw.to_string(),
        });
    }

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(PriceError::Unparseable {
            raw: raw.to_string(),
        }),
    }
}

/// 多個小數點時只保留最後一個，其餘視為千分位（"1.234.50" -> "1234.50"）
fn keep_last_decimal_point(cleaned: &str) -> String {
    match cleaned.rsplit_once('.') {
        Some((head, tail)) if head.contains('.') => format!("{}.{}", head.replace('.', ""), tail),
        _ => cleaned.to_string(),
    }
}
