use price_report_etl::domain::model::ErrorKind;
use price_report_etl::{
    BatchProducer, BatchStatistics, DedupPolicy, EtlEngine, EtlError, LocalStorage, TomlConfig,
};
use std::fs;
use tempfile::TempDir;

fn setup(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let raw = temp_dir.path().join("raw");
    fs::create_dir_all(&raw).unwrap();
    for (name, content) in files {
        fs::write(raw.join(name), content).unwrap();
    }
    temp_dir
}

fn config() -> TomlConfig {
    let mut config = TomlConfig::default();
    config.producer.input_directory = "raw".to_string();
    config.producer.output_directory = "output".to_string();
    config.producer.csv_filename = "report.csv".to_string();
    config
}

fn engine(
    temp_dir: &TempDir,
    config: TomlConfig,
) -> EtlEngine<BatchProducer<LocalStorage, TomlConfig>> {
    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let pipeline = BatchProducer::new(storage, config).unwrap();
    EtlEngine::new(pipeline)
}

fn read_csv(temp_dir: &TempDir, path: &str) -> String {
    let bytes = fs::read(temp_dir.path().join(path)).unwrap();
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(&bytes);
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_wrapped_product_with_thai_stock_text() {
    let temp_dir = setup(&[(
        "search_iphone.json",
        r#"{"products":[{"name":"iPhone 15","sku":"A1","price":"฿29,900","stock_status":"มีสินค้า"}]}"#,
    )]);

    let (path, stats) = engine(&temp_dir, config()).run("raw").await.unwrap();

    assert_eq!(path, "output/report.csv");
    assert_eq!(stats.records_validated, 1);
    let csv = read_csv(&temp_dir, &path);
    assert_eq!(
        csv,
        "Name,SKU,Price,Stock Status,Source\niPhone 15,A1,29900.00,In Stock,search_iphone.json\n"
    );
}

#[tokio::test]
async fn test_single_object_document() {
    let temp_dir = setup(&[(
        "case.json",
        r#"{"name":"Case","sku":"B2","price":199,"stock_status":"หมด"}"#,
    )]);

    let (path, _) = engine(&temp_dir, config()).run("raw").await.unwrap();

    let csv = read_csv(&temp_dir, &path);
    assert!(csv.contains("Case,B2,199.00,Out of Stock,case.json"));
}

#[tokio::test]
async fn test_missing_name_is_reported_not_exported() {
    let temp_dir = setup(&[
        ("a.json", r#"{"products":[{"name":"","sku":"C3","price":"100"}]}"#),
        ("b.json", r#"{"products":[{"name":"Charger","sku":"K1","price":"590"}]}"#),
    ]);

    let (path, stats) = engine(&temp_dir, config()).run("raw").await.unwrap();

    assert_eq!(stats.records_rejected, 1);
    let errors: Vec<_> = stats.errors_of(ErrorKind::Validation).collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("name"));
    assert!(errors[0].context.contains("a.json"));
    assert!(errors[0].context.contains("C3"));
    assert!(!read_csv(&temp_dir, &path).contains("C3"));
}

#[tokio::test]
async fn test_unparseable_price_names_raw_input() {
    let temp_dir = setup(&[(
        "a.json",
        r#"{"products":[{"name":"X","sku":"D4","price":"not-a-price"}]}"#,
    )]);

    let mut stats = BatchStatistics::new();
    let err = engine(&temp_dir, config())
        .run_with_stats("raw", &mut stats)
        .await
        .unwrap_err();

    // 唯一一筆被拒絕，所以整次執行失敗
    assert!(matches!(err, EtlError::NoValidProducts { .. }));
    assert_eq!(stats.records_rejected, 1);
    assert!(stats.errors[0].message.contains("not-a-price"));
}

#[tokio::test]
async fn test_duplicate_sku_across_files_last_seen_wins() {
    let temp_dir = setup(&[
        ("1_morning.json", r#"[{"name":"Galaxy S24","sku":"E5","price":"32,900"}]"#),
        ("2_evening.json", r#"[{"name":"Galaxy S24","sku":"E5","price":"31,900"}]"#),
    ]);

    let (path, stats) = engine(&temp_dir, config()).run("raw").await.unwrap();

    assert_eq!(stats.duplicates_removed, 1);
    let csv = read_csv(&temp_dir, &path);
    assert_eq!(csv.lines().filter(|line| line.contains(",E5,")).count(), 1);
    assert!(csv.contains("Galaxy S24,E5,31900.00,Unknown,2_evening.json"));
}

#[tokio::test]
async fn test_duplicate_sku_first_seen_policy() {
    let temp_dir = setup(&[
        ("1_morning.json", r#"[{"name":"Galaxy S24","sku":"E5","price":"32,900"}]"#),
        ("2_evening.json", r#"[{"name":"Galaxy S24","sku":"E5","price":"31,900"}]"#),
    ]);
    let mut config = config();
    config.producer.dedup_policy = DedupPolicy::FirstSeen;

    let (path, _) = engine(&temp_dir, config).run("raw").await.unwrap();

    assert!(read_csv(&temp_dir, &path).contains("Galaxy S24,E5,32900.00,Unknown,1_morning.json"));
}

#[tokio::test]
async fn test_empty_files_fail_without_writing_report() {
    let temp_dir = setup(&[
        ("a.json", r#"{"products":[]}"#),
        ("b.json", r#"{"data":{"products":[]}}"#),
        ("c.json", "[]"),
    ]);

    let mut stats = BatchStatistics::new();
    let err = engine(&temp_dir, config())
        .run_with_stats("raw", &mut stats)
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::NoValidProducts { .. }));
    assert_eq!(stats.files_processed, 3);
    assert!(!temp_dir.path().join("output/report.csv").exists());
}

#[tokio::test]
async fn test_one_malformed_file_among_many() {
    let temp_dir = setup(&[
        ("a.json", r#"[{"name":"A","sku":"A1","price":10}]"#),
        ("b.json", r#"{"products":[{"name":"B","sku":"B1","price":20}"#),
        ("c.json", r#"[{"name":"C","sku":"C1","price":30}]"#),
        ("d.json", r#"[{"name":"D","sku":"D1","price":40}]"#),
    ]);

    let (path, stats) = engine(&temp_dir, config()).run("raw").await.unwrap();

    assert_eq!(stats.files_processed, 3);
    assert_eq!(stats.files_failed, 1);
    let file_errors: Vec<_> = stats.errors_of(ErrorKind::File).collect();
    assert_eq!(file_errors.len(), 1);
    assert_eq!(file_errors[0].context, "b.json");

    let csv = read_csv(&temp_dir, &path);
    assert_eq!(csv.lines().count(), 4);
    assert!(!csv.contains("B1"));
}

#[tokio::test]
async fn test_no_readable_files_is_fatal() {
    let temp_dir = setup(&[("a.json", "<html>blocked</html>"), ("b.json", "")]);

    let mut stats = BatchStatistics::new();
    let err = engine(&temp_dir, config())
        .run_with_stats("raw", &mut stats)
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::NoFilesProcessed { files_failed: 2, .. }));
    // 沒有報表時錯誤清單仍可取得
    let contexts: Vec<&str> = stats
        .errors_of(ErrorKind::File)
        .map(|e| e.context.as_str())
        .collect();
    assert_eq!(contexts, vec!["a.json", "b.json"]);
    assert!(stats.errors.iter().all(|e| !e.message.is_empty()));
}

#[tokio::test]
async fn test_missing_input_directory() {
    let temp_dir = TempDir::new().unwrap();

    let err = engine(&temp_dir, config()).run("raw").await.unwrap_err();

    assert!(matches!(err, EtlError::InputNotFound { .. }));
}

#[tokio::test]
async fn test_thai_names_survive_with_bom() {
    let temp_dir = setup(&[(
        "thai.json",
        r#"{"products":[{"productName":"  สายชาร์จ   USB-C  ","productId":"usb-c-1m","pricing":{"current":"1,290 บาท"},"availability":{"status":"พร้อมส่ง"}}]}"#,
    )]);

    let (path, _) = engine(&temp_dir, config()).run("raw").await.unwrap();

    let bytes = fs::read(temp_dir.path().join(&path)).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    let csv = read_csv(&temp_dir, &path);
    assert!(csv.contains("สายชาร์จ USB-C,USB-C-1M,1290.00,In Stock,thai.json"));
}

#[tokio::test]
async fn test_summary_json_written_next_to_csv() -> anyhow::Result<()> {
    let temp_dir = setup(&[
        ("a.json", r#"[{"name":"A","sku":"A1","price":"฿100","stock":"out of stock"}]"#),
        ("b.json", "{ broken"),
        ("c.json", r#"[{"name":"","sku":"C1","price":5}]"#),
    ]);
    let mut config = config();
    config.producer.csv_filename = "competitor_prices_{date}.csv".to_string();

    let (path, _) = engine(&temp_dir, config).run("raw").await?;

    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    assert_eq!(path, format!("output/competitor_prices_{}.csv", today));

    let summary_file = temp_dir
        .path()
        .join(format!("output/competitor_prices_{}_summary.json", today));
    let summary: serde_json::Value = serde_json::from_slice(&fs::read(summary_file)?)?;

    assert_eq!(summary["files_processed"], 2);
    assert_eq!(summary["files_failed"], 1);
    assert_eq!(summary["records_extracted"], 2);
    assert_eq!(summary["records_validated"], 1);
    assert_eq!(summary["records_rejected"], 1);
    assert_eq!(summary["products_exported"], 1);
    assert_eq!(summary["stock_normalization"]["out_of_stock"], 1);
    assert_eq!(summary["errors"].as_array().map(Vec::len), Some(2));
    assert_eq!(summary["errors"][0]["kind"], "file");
    assert_eq!(summary["errors"][1]["kind"], "validation");
    Ok(())
}

#[tokio::test]
async fn test_summary_can_be_disabled() {
    let temp_dir = setup(&[("a.json", r#"[{"name":"A","sku":"A1","price":1}]"#)]);
    let mut config = config();
    config.producer.write_summary = false;

    engine(&temp_dir, config).run("raw").await.unwrap();

    let outputs: Vec<_> = fs::read_dir(temp_dir.path().join("output"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(outputs, vec!["report.csv".to_string()]);
}
