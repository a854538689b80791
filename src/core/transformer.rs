use crate::core::price::parse_price;
use crate::core::stock::StockStatusNormalizer;
use crate::domain::model::{NormalizationStats, Product, RawRecord, TransformResult};
use crate::utils::error::{RecordContext, TransformError};

pub const MAX_NAME_CHARS: usize = 500;
pub const MAX_SKU_CHARS: usize = 100;
/// 超過此價格只記警告，不拒絕
pub const SUSPICIOUS_PRICE_THB: f64 = 1_000_000.0;

/// 將 `RawRecord` 轉換成通過驗證的 `Product`
#[derive(Debug, Clone, Default)]
pub struct ProductTransformer {
    normalizer: StockStatusNormalizer,
}

impl ProductTransformer {
    pub fn new(normalizer: StockStatusNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn transform(&self, record: &RawRecord) -> Result<Product, TransformError> {
        self.transform_tracked(record, &mut NormalizationStats::default())
    }

    /// 單筆失敗不會中斷整批
    pub fn transform_batch(&self, records: &[RawRecord]) -> TransformResult {
        let mut result = TransformResult::default();
        for record in records {
            match self.transform_tracked(record, &mut result.stock_stats) {
                Ok(product) => result.products.push(product),
                Err(e) => {
                    tracing::warn!("🔶 Rejected record: {}", e);
                    result.errors.push(e);
                }
            }
        }
        result
    }

    fn transform_tracked(
        &self,
        record: &RawRecord,
        stock_stats: &mut NormalizationStats,
    ) -> Result<Product, TransformError> {
        let mut context = RecordContext {
            document: record.source_document.clone(),
            sku: record
                .sku
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            name: record
                .name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };

        let name = clean_name(record.name.as_deref()).ok_or_else(|| {
            TransformError::MissingName {
                context: context.clone(),
            }
        })?;
        context.name = Some(name.clone());

        let sku = clean_sku(record.sku.as_deref()).map_err(|reason| TransformError::InvalidSku {
            context: context.clone(),
            reason,
        })?;
        context.sku = Some(sku.clone());

        let price = parse_price(record.price_raw.as_ref()).map_err(|source| {
            TransformError::InvalidPrice {
                context: context.clone(),
                source,
            }
        })?;
        if price < 0.0 {
            return Err(TransformError::ValidationError {
                context,
                field: "price",
                reason: format!("price cannot be negative ({})", price),
            });
        }
        let price = round_price(price);
        if !price.is_finite() {
            return Err(TransformError::ValidationError {
                context,
                field: "price",
                reason: format!("price must be a finite number ({})", price),
            });
        }
        if price > SUSPICIOUS_PRICE_THB {
            tracing::warn!("🔶 Unusually high price {:.2} THB [{}]", price, context);
        }

        let stock_status = self
            .normalizer
            .normalize_tracked(record.stock_raw.as_deref(), stock_stats);

        Ok(Product {
            name,
            sku,
            price,
            stock_status,
            source: record.source_document.clone(),
        })
    }
}

/// 去除前後空白並壓縮內部空白；過長的名稱截斷
pub fn clean_name(raw: Option<&str>) -> Option<String> {
    let collapsed = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    if collapsed.chars().count() > MAX_NAME_CHARS {
        let truncated: String = collapsed.chars().take(MAX_NAME_CHARS - 3).collect();
        return Some(format!("{}...", truncated));
    }
    Some(collapsed)
}

/// 去除空白並轉大寫；空 SKU 一律拒絕，不自動產生
pub fn clean_sku(raw: Option<&str>) -> Result<String, String> {
    let sku = raw.map(str::trim).unwrap_or_default();
    if sku.is_empty() {
        return Err("SKU is missing or empty".to_string());
    }
    if sku.chars().count() > MAX_SKU_CHARS {
        return Err(format!(
            "SKU is longer than {} characters",
            MAX_SKU_CHARS
        ));
    }
    Ok(sku.to_uppercase())
}

/// 四捨五入到小數兩位；放大後溢位的極大值本來就沒有小數，原樣回傳
pub fn round_price(price: f64) -> f64 {
    let scaled = price * 100.0;
    if !scaled.is_finite() {
        return price;
    }
    scaled.round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{RawPrice, StockStatus};
    use crate::utils::error::PriceError;

    fn raw(name: Option<&str>, sku: Option<&str>, price: Option<RawPrice>, stock: Option<&str>) -> RawRecord {
        RawRecord {
            name: name.map(str::to_string),
            sku: sku.map(str::to_string),
            price_raw: price,
            stock_raw: stock.map(str::to_string),
            source_document: "search_iphone.json".to_string(),
            fragment: serde_json::Value::Null,
        }
    }

    fn text(s: &str) -> Option<RawPrice> {
        Some(RawPrice::Text(s.to_string()))
    }

    #[test]
    fn test_transform_valid_record() {
        let transformer = ProductTransformer::default();
        let product = transformer
            .transform(&raw(Some("  iPhone 15 "), Some(" a1 "), text("฿29,900"), Some("มีสินค้า")))
            .unwrap();

        assert_eq!(product.name(), "iPhone 15");
        assert_eq!(product.sku(), "A1");
        assert_eq!(product.price(), 29900.0);
        assert_eq!(product.stock_status(), StockStatus::InStock);
        assert_eq!(product.source(), "search_iphone.json");
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let transformer = ProductTransformer::default();
        for name in [None, Some(""), Some("   ")] {
            let err = transformer
                .transform(&raw(name, Some("C3"), text("100"), None))
                .unwrap_err();
            assert!(matches!(err, TransformError::MissingName { .. }));
            assert_eq!(err.context().sku.as_deref(), Some("C3"));
        }
    }

    #[test]
    fn test_empty_sku_is_rejected() {
        let transformer = ProductTransformer::default();
        for sku in [None, Some(""), Some("  ")] {
            let err = transformer
                .transform(&raw(Some("Case"), sku, text("100"), None))
                .unwrap_err();
            assert!(matches!(err, TransformError::InvalidSku { .. }));
            assert_eq!(err.context().name.as_deref(), Some("Case"));
        }

        let long_sku = "X".repeat(MAX_SKU_CHARS + 1);
        let err = transformer
            .transform(&raw(Some("Case"), Some(&long_sku), text("100"), None))
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidSku { .. }));
    }

    #[test]
    fn test_missing_price_differs_from_unparseable() {
        let transformer = ProductTransformer::default();
        let missing = transformer
            .transform(&raw(Some("X"), Some("D4"), None, None))
            .unwrap_err();
        let malformed = transformer
            .transform(&raw(Some("X"), Some("D4"), text("not-a-price"), None))
            .unwrap_err();

        assert!(matches!(
            missing,
            TransformError::InvalidPrice {
                source: PriceError::Missing,
                ..
            }
        ));
        assert!(matches!(
            malformed,
            TransformError::InvalidPrice {
                source: PriceError::Unparseable { .. },
                ..
            }
        ));
        assert_ne!(missing.to_string(), malformed.to_string());
        assert!(malformed.to_string().contains("not-a-price"));
    }

    #[test]
    fn test_negative_price_is_a_validation_error() {
        let transformer = ProductTransformer::default();
        let err = transformer
            .transform(&raw(Some("X"), Some("N1"), Some(RawPrice::Number(-1.0)), None))
            .unwrap_err();
        assert!(matches!(err, TransformError::ValidationError { field: "price", .. }));
    }

    #[test]
    fn test_price_is_rounded_to_two_decimals() {
        let transformer = ProductTransformer::default();
        let product = transformer
            .transform(&raw(Some("X"), Some("R1"), text("1,999.999"), None))
            .unwrap();
        assert_eq!(product.price(), 2000.0);

        let product = transformer
            .transform(&raw(Some("X"), Some("R2"), Some(RawPrice::Number(12.345678)), None))
            .unwrap();
        assert_eq!(product.price(), 12.35);
    }

    #[test]
    fn test_huge_price_stays_finite_after_rounding() {
        let transformer = ProductTransformer::default();
        let product = transformer
            .transform(&raw(Some("X"), Some("H1"), text("1e307"), None))
            .unwrap();
        assert!(product.price().is_finite());
        assert_eq!(product.price(), 1e307);

        let err = transformer
            .transform(&raw(Some("X"), Some("H2"), Some(RawPrice::Number(f64::INFINITY)), None))
            .unwrap_err();
        assert!(matches!(err, TransformError::ValidationError { field: "price", .. }));
    }

    #[test]
    fn test_missing_stock_is_unknown() {
        let transformer = ProductTransformer::default();
        let product = transformer
            .transform(&raw(Some("X"), Some("S1"), text("10"), None))
            .unwrap();
        assert_eq!(product.stock_status(), StockStatus::Unknown);
    }

    #[test]
    fn test_name_cleaning() {
        assert_eq!(clean_name(Some(" Galaxy\n  S24\tUltra ")).as_deref(), Some("Galaxy S24 Ultra"));
        assert_eq!(clean_name(Some("\n\t")), None);

        let long = "ก".repeat(MAX_NAME_CHARS + 20);
        let cleaned = clean_name(Some(&long)).unwrap();
        assert_eq!(cleaned.chars().count(), MAX_NAME_CHARS);
        assert!(cleaned.ends_with("..."));
    }

    #[test]
    fn test_transform_batch_isolates_failures() {
        let transformer = ProductTransformer::default();
        let records = vec![
            raw(Some("A"), Some("A1"), text("100"), Some("หมด")),
            raw(None, Some("B1"), text("100"), None),
            raw(Some("C"), Some("C1"), text("abc"), None),
            raw(Some("D"), Some("D1"), text("฿1,000"), Some("In Stock")),
        ];
        let result = transformer.transform_batch(&records);

        assert_eq!(result.products.len(), 2);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.products[0].stock_status(), StockStatus::OutOfStock);
        assert_eq!(result.stock_stats.total_normalized, 2);
        for product in &result.products {
            assert!(product.price() >= 0.0);
            assert_eq!(round_price(product.price()), product.price());
        }
    }
}
