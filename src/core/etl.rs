use crate::core::Pipeline;
use crate::domain::model::{BatchStatistics, ErrorKind};
use crate::utils::error::Result;
use crate::utils::monitor::{EtlPhase, SystemMonitor};
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// 每次執行都建立新的統計，成功時連同輸出路徑一起回傳
    pub async fn run(&self, input: &str) -> Result<(String, BatchStatistics)> {
        let mut stats = BatchStatistics::new();
        let output_path = self.run_with_stats(input, &mut stats).await?;
        Ok((output_path, stats))
    }

    /// 失敗時呼叫端仍可從 `stats` 取得已累積的錯誤
    pub async fn run_with_stats(&self, input: &str, stats: &mut BatchStatistics) -> Result<String> {
        tracing::info!("🚀 Starting ETL process for {}", input);
        let started = Instant::now();
        if self.monitor.is_enabled() {
            tracing::info!("🔍 System monitoring enabled");
        }
        self.monitor.log_phase(EtlPhase::Start, 0);

        let result = self.run_phases(input, stats).await;

        log_summary(stats, result.is_err());
        self.monitor.log_final_stats(stats);
        match &result {
            Ok(path) => tracing::info!(
                "✅ ETL finished in {:.2?}, report at {}",
                started.elapsed(),
                path
            ),
            Err(e) => tracing::error!("❌ ETL failed after {:.2?}: {}", started.elapsed(), e),
        }
        result
    }

    async fn run_phases(&self, input: &str, stats: &mut BatchStatistics) -> Result<String> {
        // Extract
        let phase = Instant::now();
        tracing::info!("📥 Extracting records...");
        let records = self.pipeline.extract(input, stats).await?;
        tracing::info!(
            "📥 Extracted {} records from {} files in {:.2?}",
            records.len(),
            stats.files_processed,
            phase.elapsed()
        );
        self.monitor.log_phase(EtlPhase::Extract, records.len());

        // Transform
        let phase = Instant::now();
        tracing::info!("🔄 Transforming records...");
        let products = self.pipeline.transform(records, stats).await?;
        tracing::info!(
            "🔄 {} products ready ({} rejected) in {:.2?}",
            products.len(),
            stats.records_rejected,
            phase.elapsed()
        );
        self.monitor.log_phase(EtlPhase::Transform, products.len());

        // Load
        let phase = Instant::now();
        tracing::info!("💾 Writing report...");
        let exported = products.len();
        let output_path = self.pipeline.load(products, stats).await?;
        tracing::info!("💾 Output saved to {} in {:.2?}", output_path, phase.elapsed());
        self.monitor.log_phase(EtlPhase::Load, exported);

        Ok(output_path)
    }
}

/// 執行失敗時逐筆錯誤以 warn 輸出
fn log_summary(stats: &BatchStatistics, failed: bool) {
    tracing::info!(
        "📊 Files: {} processed, {} failed ({:.1}% success)",
        stats.files_processed,
        stats.files_failed,
        stats.file_success_rate()
    );
    tracing::info!(
        "📊 Records: {} extracted, {} validated, {} rejected ({:.1}% valid), {} duplicates removed",
        stats.records_extracted,
        stats.records_validated,
        stats.records_rejected,
        stats.validation_success_rate(),
        stats.duplicates_removed
    );
    let stock = &stats.stock_normalization;
    if stock.total_normalized > 0 {
        tracing::info!(
            "📊 Stock: {} in stock, {} out of stock, {} unknown ({:.1}% recognized)",
            stock.in_stock,
            stock.out_of_stock,
            stock.unknown,
            stock.success_rate()
        );
    }
    for kind in [ErrorKind::File, ErrorKind::Extraction, ErrorKind::Validation] {
        let count = stats.errors_of(kind).count();
        if count > 0 {
            tracing::warn!("⚠️ {} {:?} errors", count, kind);
        }
    }
    for error in &stats.errors {
        if failed {
            tracing::warn!("  [{:?}] {}: {}", error.kind, error.context, error.message);
        } else {
            tracing::debug!("  [{:?}] {}: {}", error.kind, error.context, error.message);
        }
    }
}
