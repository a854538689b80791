use crate::core::export::CsvExporter;
use crate::core::extractor;
use crate::core::stock::StockStatusNormalizer;
use crate::core::transformer::ProductTransformer;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{
    BatchStatistics, DedupPolicy, ErrorKind, ProcessingSummary, Product, RawRecord,
};
use crate::utils::error::{EtlError, Result};
use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 讀取整個目錄的 JSON 擷取檔，產出去重後的商品 CSV
pub struct BatchProducer<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    transformer: ProductTransformer,
    exporter: CsvExporter,
}

impl<S: Storage, C: ConfigProvider> BatchProducer<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let normalizer = StockStatusNormalizer::with_custom_patterns(
            config.in_stock_patterns(),
            config.out_of_stock_patterns(),
        )?;
        if normalizer.custom_pattern_count() > 0 {
            tracing::info!(
                "🔧 Loaded {} custom stock patterns",
                normalizer.custom_pattern_count()
            );
        }

        Ok(Self {
            exporter: CsvExporter::new(config.utf8_bom()),
            transformer: ProductTransformer::new(normalizer),
            storage,
            config,
        })
    }

    /// 處理單一檔案；回傳 `None` 表示整個檔案失敗（已記入統計）
    async fn process_file(
        &self,
        path: &str,
        stats: &mut BatchStatistics,
    ) -> Option<Vec<RawRecord>> {
        let source_id = source_id(path);
        let mut fail = |message: String| {
            tracing::warn!("⚠️ Skipping {}: {}", source_id, message);
            stats.record_error(ErrorKind::File, source_id.clone(), message);
            stats.files_failed += 1;
        };

        let size = match self.storage.file_size(path).await {
            Ok(size) => size,
            Err(e) => {
                fail(format!("cannot stat file: {}", e));
                return None;
            }
        };
        let limit = self.config.max_file_size_bytes();
        if size > limit {
            fail(format!(
                "file is {} bytes, larger than the {} byte limit",
                size, limit
            ));
            return None;
        }

        let bytes = match self.storage.read_file(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                fail(format!("cannot read file: {}", e));
                return None;
            }
        };
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

        let document: serde_json::Value = match serde_json::from_slice(body) {
            Ok(document) => document,
            Err(e) => {
                fail(format!("invalid JSON: {}", e));
                return None;
            }
        };

        let extraction = extractor::extract(&document, &source_id);
        if extraction.shape.is_none() {
            let reason = extraction
                .errors
                .first()
                .map(|e| e.reason.clone())
                .unwrap_or_else(|| "unrecognized document shape".to_string());
            fail(reason);
            return None;
        }

        stats.files_processed += 1;
        for error in &extraction.errors {
            let context = match error.index {
                Some(index) => format!("{}#{}", error.document, index),
                None => error.document.clone(),
            };
            stats.record_error(ErrorKind::Extraction, context, error.reason.clone());
        }
        Some(extraction.records)
    }

    fn output_path(&self, date: NaiveDate) -> String {
        let filename = render_filename(self.config.csv_filename(), date);
        Path::new(self.config.output_directory())
            .join(filename)
            .to_string_lossy()
            .into_owned()
    }

    async fn write_summary(&self, csv_path: &str, products_exported: usize, stats: &BatchStatistics) {
        let summary_path = summary_path(csv_path);
        let summary = ProcessingSummary::from_stats(stats, products_exported, csv_path);

        let result = match serde_json::to_vec_pretty(&summary) {
            Ok(data) => self.storage.write_file(&summary_path, &data).await,
            Err(e) => Err(e.into()),
        };
        // CSV 已通過驗證，摘要寫入失敗不影響本次執行結果
        match result {
            Ok(()) => tracing::info!("📝 Summary saved to: {}", summary_path),
            Err(e) => tracing::warn!("⚠️ Could not write summary {}: {}", summary_path, e),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for BatchProducer<S, C> {
    async fn extract(&self, input: &str, stats: &mut BatchStatistics) -> Result<Vec<RawRecord>> {
        let files = self.storage.list_files(input, "json").await?;
        tracing::info!("📂 Found {} JSON files in {}", files.len(), input);

        let mut records = Vec::new();
        for path in &files {
            if let Some(extracted) = self.process_file(path, stats).await {
                records.extend(extracted);
            }
        }
        stats.records_extracted += records.len();

        if stats.files_processed == 0 {
            return Err(EtlError::NoFilesProcessed {
                directory: input.to_string(),
                files_failed: stats.files_failed,
            });
        }
        Ok(records)
    }

    async fn transform(
        &self,
        records: Vec<RawRecord>,
        stats: &mut BatchStatistics,
    ) -> Result<Vec<Product>> {
        let result = self.transformer.transform_batch(&records);

        stats.records_validated += result.products.len();
        stats.records_rejected += result.errors.len();
        for error in &result.errors {
            stats.record_error(
                ErrorKind::Validation,
                error.context().to_string(),
                error.reason(),
            );
        }
        stats.stock_normalization.merge(result.stock_stats);

        let (products, removed) = deduplicate(result.products, self.config.dedup_policy());
        stats.duplicates_removed += removed;
        if removed > 0 {
            tracing::info!(
                "🧹 Removed {} duplicate SKUs ({:?})",
                removed,
                self.config.dedup_policy()
            );
        }

        if products.is_empty() {
            return Err(EtlError::NoValidProducts {
                files_processed: stats.files_processed,
                records_rejected: stats.records_rejected,
            });
        }
        Ok(products)
    }

    async fn load(&self, products: Vec<Product>, stats: &mut BatchStatistics) -> Result<String> {
        let target = self.output_path(Local::now().date_naive());
        let path = self
            .exporter
            .export(&self.storage, &products, &target)
            .await?;

        if self.config.write_summary() {
            self.write_summary(&path, products.len(), stats).await;
        }
        Ok(path)
    }
}

/// 以 SKU 去重；保留的那一筆放在該 SKU 第一次出現的位置
pub fn deduplicate(products: Vec<Product>, policy: DedupPolicy) -> (Vec<Product>, usize) {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Product> = Vec::with_capacity(products.len());
    let mut removed = 0;

    for product in products {
        match positions.get(product.sku()) {
            Some(&index) => {
                removed += 1;
                tracing::debug!(
                    "🔁 Duplicate SKU {} ({} vs {})",
                    product.sku(),
                    unique[index].source(),
                    product.source()
                );
                if policy == DedupPolicy::LastSeen {
                    unique[index] = product;
                }
            }
            None => {
                positions.insert(product.sku().to_string(), unique.len());
                unique.push(product);
            }
        }
    }
    (unique, removed)
}

pub fn render_filename(template: &str, date: NaiveDate) -> String {
    template.replace("{date}", &date.format("%Y-%m-%d").to_string())
}

/// `report.csv` -> `report_summary.json`
pub fn summary_path(csv_path: &str) -> String {
    let path = Path::new(csv_path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!("{}_summary.json", stem))
        .to_string_lossy()
        .into_owned()
}

fn source_id(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
