use clap::Parser;
use price_report_etl::config::LogFormat;
use price_report_etl::core::{ConfigProvider, Storage};
use price_report_etl::utils::error::ErrorSeverity;
use price_report_etl::utils::{logger, validation::Validate};
use price_report_etl::{
    BatchProducer, BatchStatistics, CliConfig, EtlEngine, EtlError, LocalStorage, TomlConfig,
};
use std::fmt::Debug;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 設定檔要先載入，日誌格式可能由檔案決定
    let toml_config = match &cli.config {
        Some(path) => match TomlConfig::from_file(path) {
            Ok(mut config) => {
                config.apply_cli_overrides(&cli);
                Some(config)
            }
            Err(e) => {
                eprintln!("❌ Cannot load {}: {}", path, e.user_friendly_message());
                eprintln!("💡 建議: {}", e.recovery_suggestion());
                std::process::exit(exit_code(&e));
            }
        },
        None => None,
    };

    let json_logs = cli.log_format == LogFormat::Json
        || toml_config.as_ref().map(TomlConfig::json_logs).unwrap_or(false);
    if json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting price-report-etl CLI");

    let code = match toml_config {
        Some(config) => {
            let monitor = config.monitoring_enabled();
            execute(config, monitor, &cli).await
        }
        None => execute(cli.clone(), cli.monitor, &cli).await,
    };

    if code > 0 {
        std::process::exit(code);
    }
    Ok(())
}

async fn execute<C>(config: C, monitor_enabled: bool, cli: &CliConfig) -> i32
where
    C: ConfigProvider + Validate + Debug,
{
    if cli.verbose {
        tracing::debug!("Effective config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        return exit_code(&e);
    }

    let storage = LocalStorage::new(".".to_string());
    let input = config.input_directory().to_string();

    if cli.dry_run {
        return match dry_run(&storage, &input, config.max_file_size_bytes()).await {
            Ok(()) => 0,
            Err(e) => report_failure(&e),
        };
    }

    let pipeline = match BatchProducer::new(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => return report_failure(&e),
    };
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    let mut stats = BatchStatistics::new();
    match engine.run_with_stats(&input, &mut stats).await {
        Ok(output_path) => {
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
            println!(
                "📊 {} files processed, {} failed; {} products exported, {} rejected, {} duplicates removed",
                stats.files_processed,
                stats.files_failed,
                stats.records_validated - stats.duplicates_removed,
                stats.records_rejected,
                stats.duplicates_removed
            );
            if !stats.errors.is_empty() {
                println!("⚠️ {} problems recorded, see the summary file for details", stats.errors.len());
            }
            0
        }
        Err(e) => {
            print_error_list(&stats);
            report_failure(&e)
        }
    }
}

const MAX_LISTED_ERRORS: usize = 20;

/// 失敗時沒有摘要檔，直接把累積的錯誤列在 stderr
fn print_error_list(stats: &BatchStatistics) {
    if stats.errors.is_empty() {
        return;
    }
    eprintln!("📋 {} problems recorded before the run stopped:", stats.errors.len());
    for error in stats.errors.iter().take(MAX_LISTED_ERRORS) {
        eprintln!("  [{:?}] {}: {}", error.kind, error.context, error.message);
    }
    if stats.errors.len() > MAX_LISTED_ERRORS {
        eprintln!(
            "  ... and {} more (the full list is in the log warnings)",
            stats.errors.len() - MAX_LISTED_ERRORS
        );
    }
}

/// 列出會被讀取的檔案與大小，不寫入任何東西
async fn dry_run(storage: &LocalStorage, input: &str, max_bytes: u64) -> Result<(), EtlError> {
    let files = storage.list_files(input, "json").await?;
    println!("🔎 {} JSON files in {}", files.len(), input);
    for path in &files {
        let size = storage.file_size(path).await?;
        let marker = if size > max_bytes { "  (over size limit, will be skipped)" } else { "" };
        println!("  {} {} bytes{}", path, size, marker);
    }
    Ok(())
}

fn report_failure(e: &EtlError) -> i32 {
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    exit_code(e)
}

// 根據錯誤嚴重程度決定退出碼
fn exit_code(e: &EtlError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
