use price_report_etl::core::extractor::{self, ShapeKind};
use price_report_etl::core::stock::StockStatusNormalizer;
use price_report_etl::{BatchProducer, EtlEngine, LocalStorage, StockStatus, TomlConfig};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const PRODUCTS: &str = r#"[
    {"name":"iPhone 15","sku":"A1","price":"฿29,900","stock_status":"มีสินค้า"},
    {"productName":"AirPods Pro","productId":"a2","pricing":{"current":"8,990 THB"},"availability":{"status":"Out of Stock"}},
    {"title":"MagSafe Charger","id":"A3","price_thb":1490,"stockStatus":"พร้อมส่ง"}
]"#;

fn shaped_documents() -> Vec<(ShapeKind, String)> {
    vec![
        (ShapeKind::Products, format!(r#"{{"products":{}}}"#, PRODUCTS)),
        (ShapeKind::NestedData, format!(r#"{{"data":{{"products":{}}}}}"#, PRODUCTS)),
        (ShapeKind::BareArray, PRODUCTS.to_string()),
    ]
}

async fn export_rows(document: &str) -> Vec<String> {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("raw")).unwrap();
    fs::write(temp_dir.path().join("raw/capture.json"), document).unwrap();

    let mut config = TomlConfig::default();
    config.producer.input_directory = "raw".to_string();
    config.producer.output_directory = "output".to_string();
    config.producer.csv_filename = "report.csv".to_string();
    config.producer.utf8_bom = false;

    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let engine = EtlEngine::new(BatchProducer::new(storage, config).unwrap());
    let (path, _) = engine.run("raw").await.unwrap();

    fs::read_to_string(temp_dir.path().join(path))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_every_list_shape_exports_the_same_rows() {
    let mut exported = Vec::new();
    for (_, document) in shaped_documents() {
        exported.push(export_rows(&document).await);
    }

    assert_eq!(
        exported[0],
        vec![
            "Name,SKU,Price,Stock Status,Source",
            "iPhone 15,A1,29900.00,In Stock,capture.json",
            "AirPods Pro,A2,8990.00,Out of Stock,capture.json",
            "MagSafe Charger,A3,1490.00,In Stock,capture.json",
        ]
    );
    assert!(exported.iter().all(|rows| rows == &exported[0]));
}

#[test]
fn test_shapes_yield_equivalent_records() {
    let item = json!({"name":"Case","sku":"B2","price":199,"stock_status":"หมด"});
    let documents = [
        (ShapeKind::Products, json!({"products":[item.clone()]})),
        (ShapeKind::NestedData, json!({"data":{"products":[item.clone()]}})),
        (ShapeKind::BareArray, json!([item.clone()])),
        (ShapeKind::SingleObject, item.clone()),
    ];

    let mut extracted = Vec::new();
    for (expected_shape, document) in &documents {
        let extraction = extractor::extract(document, "case.json");
        assert_eq!(extraction.shape, Some(*expected_shape));
        assert!(extraction.errors.is_empty());
        extracted.push(extraction.records);
    }

    for records in &extracted {
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, extracted[0][0].name);
        assert_eq!(records[0].sku, extracted[0][0].sku);
        assert_eq!(records[0].price_raw, extracted[0][0].price_raw);
        assert_eq!(records[0].stock_raw, extracted[0][0].stock_raw);
    }
}

#[test]
fn test_stock_normalization_is_total() {
    let normalizer = StockStatusNormalizer::new();
    let inputs = [
        "",
        "   ",
        "!!!",
        "🙂",
        "null",
        "มี",
        "ไม่มีสินค้า",
        "Available now",
        "NOT AVAILABLE.",
        "\u{0}\u{7f}",
        "ราคา 1,290 บาท",
        "x".repeat(10_000).as_str(),
    ]
    .map(str::to_string);

    for input in inputs {
        let status = normalizer.normalize(Some(&input));
        assert!(matches!(
            status,
            StockStatus::InStock | StockStatus::OutOfStock | StockStatus::Unknown
        ));
    }
    assert_eq!(normalizer.normalize(Some("ไม่มีสินค้า")), StockStatus::OutOfStock);
    assert_eq!(normalizer.normalize(Some("NOT AVAILABLE.")), StockStatus::OutOfStock);
    assert_eq!(normalizer.normalize(None), StockStatus::Unknown);
}
