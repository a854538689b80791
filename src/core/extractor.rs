//! 從任意形狀的 JSON 文件中找出商品清單並抽取原始欄位。
//!
//! 抽取永不失敗：無法處理的項目會變成錯誤清單中的一筆，其餘項目照常抽取。

use crate::domain::model::{RawPrice, RawRecord};
use crate::utils::error::ExtractionError;
use serde_json::{Map, Value};

/// 欄位別名表（以點分隔巢狀路徑），依序取第一個非 null 的值
pub struct FieldAliases;

impl FieldAliases {
    pub const NAME: &'static [&'static str] = &["name", "productName", "product_name", "title"];
    pub const SKU: &'static [&'static str] = &["sku", "SKU", "productId", "product_id", "id"];
    pub const PRICE: &'static [&'static str] = &[
        "price",
        "pricing.current",
        "pricing.price",
        "price_thb",
        "salePrice",
    ];
    pub const STOCK: &'static [&'static str] = &[
        "stock_status",
        "stockStatus",
        "availability.status",
        "stock",
    ];

    fn all() -> impl Iterator<Item = &'static str> {
        Self::NAME
            .iter()
            .chain(Self::SKU)
            .chain(Self::PRICE)
            .chain(Self::STOCK)
            .copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Products,
    NestedData,
    BareArray,
    SingleObject,
}

/// 已辨識的文件形狀，持有指向商品資料的參照
#[derive(Debug)]
pub enum DocumentShape<'a> {
    /// `{ "products": [...] }`
    Products(&'a [Value]),
    /// `{ "data": { "products": [...] } }`
    NestedData(&'a [Value]),
    /// `[ {...}, {...} ]`
    BareArray(&'a [Value]),
    /// `{ "name": ..., "sku": ... }`
    SingleObject(&'a Map<String, Value>),
}

impl<'a> DocumentShape<'a> {
    /// 依優先順序嘗試每種形狀，回傳第一個結構相符者
    pub fn detect(document: &'a Value) -> Option<Self> {
        if let Some(items) = document.get("products").and_then(Value::as_array) {
            return Some(DocumentShape::Products(items));
        }
        if let Some(items) = document
            .get("data")
            .and_then(|d| d.get("products"))
            .and_then(Value::as_array)
        {
            return Some(DocumentShape::NestedData(items));
        }
        if let Some(items) = document.as_array() {
            return Some(DocumentShape::BareArray(items));
        }
        match document.as_object() {
            Some(obj) if FieldAliases::all().any(|path| lookup(obj, path).is_some()) => {
                Some(DocumentShape::SingleObject(obj))
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            DocumentShape::Products(_) => ShapeKind::Products,
            DocumentShape::NestedData(_) => ShapeKind::NestedData,
            DocumentShape::BareArray(_) => ShapeKind::BareArray,
            DocumentShape::SingleObject(_) => ShapeKind::SingleObject,
        }
    }
}

#[derive(Debug, Default)]
pub struct Extraction {
    /// `None` 表示文件形狀無法辨識
    pub shape: Option<ShapeKind>,
    pub records: Vec<RawRecord>,
    pub errors: Vec<ExtractionError>,
}

pub fn extract(document: &Value, source_id: &str) -> Extraction {
    let Some(shape) = DocumentShape::detect(document) else {
        return Extraction {
            shape: None,
            records: Vec::new(),
            errors: vec![ExtractionError {
                document: source_id.to_string(),
                index: None,
                reason: format!("unrecognized document shape ({})", describe(document)),
            }],
        };
    };

    let mut extraction = Extraction {
        shape: Some(shape.kind()),
        ..Default::default()
    };

    match shape {
        DocumentShape::Products(items)
        | DocumentShape::NestedData(items)
        | DocumentShape::BareArray(items) => {
            for (index, item) in items.iter().enumerate() {
                match extract_item(item, source_id) {
                    Ok(record) => extraction.records.push(record),
                    Err(reason) => {
                        tracing::warn!("🔶 {}#{}: skipped item: {}", source_id, index, reason);
                        extraction.errors.push(ExtractionError {
                            document: source_id.to_string(),
                            index: Some(index),
                            reason,
                        });
                    }
                }
            }
        }
        DocumentShape::SingleObject(obj) => match extract_fields(obj, source_id) {
            Ok(record) => extraction.records.push(record),
            Err(reason) => extraction.errors.push(ExtractionError {
                document: source_id.to_string(),
                index: None,
                reason,
            }),
        },
    }

    tracing::debug!(
        "📥 {}: {:?} shape, {} records, {} item errors",
        source_id,
        extraction.shape,
        extraction.records.len(),
        extraction.errors.len()
    );
    extraction
}

fn extract_item(item: &Value, source_id: &str) -> Result<RawRecord, String> {
    match item.as_object() {
        Some(obj) => extract_fields(obj, source_id),
        None => Err(format!("item is not an object ({})", describe(item))),
    }
}

fn extract_fields(obj: &Map<String, Value>, source_id: &str) -> Result<RawRecord, String> {
    Ok(RawRecord {
        name: text_field(obj, FieldAliases::NAME, "name")?,
        sku: text_field(obj, FieldAliases::SKU, "sku")?,
        price_raw: price_field(obj)?,
        stock_raw: stock_field(obj)?,
        source_document: source_id.to_string(),
        fragment: Value::Object(obj.clone()),
    })
}

/// 以點分隔路徑讀取巢狀欄位，null 視為不存在
fn lookup<'v>(obj: &'v Map<String, Value>, path: &str) -> Option<&'v Value> {
    let mut segments = path.split('.');
    let mut current = obj.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    (!current.is_null()).then_some(current)
}

fn first_present<'v>(
    obj: &'v Map<String, Value>,
    aliases: &'static [&'static str],
) -> Option<(&'static str, &'v Value)> {
    aliases
        .iter()
        .find_map(|path| lookup(obj, path).map(|v| (*path, v)))
}

fn text_field(
    obj: &Map<String, Value>,
    aliases: &'static [&'static str],
    field: &str,
) -> Result<Option<String>, String> {
    match first_present(obj, aliases) {
        None => Ok(None),
        Some((_, Value::String(s))) => Ok(Some(s.clone())),
        Some((_, Value::Number(n))) => Ok(Some(number_text(n))),
        Some((path, other)) => Err(format!(
            "{} ('{}') must be text, got {}",
            field,
            path,
            describe(other)
        )),
    }
}

fn price_field(obj: &Map<String, Value>) -> Result<Option<RawPrice>, String> {
    match first_present(obj, FieldAliases::PRICE) {
        None => Ok(None),
        Some((_, Value::String(s))) => Ok(Some(RawPrice::Text(s.clone()))),
        Some((path, Value::Number(n))) => n
            .as_f64()
            .map(|v| Some(RawPrice::Number(v)))
            .ok_or_else(|| format!("price ('{}') is not representable: {}", path, n)),
        Some((path, other)) => Err(format!(
            "price ('{}') must be text or a number, got {}",
            path,
            describe(other)
        )),
    }
}

fn stock_field(obj: &Map<String, Value>) -> Result<Option<String>, String> {
    match first_present(obj, FieldAliases::STOCK) {
        None => Ok(None),
        Some((_, Value::String(s))) => Ok(Some(s.clone())),
        Some((_, Value::Number(n))) => Ok(Some(number_text(n))),
        Some((_, Value::Bool(b))) => Ok(Some(b.to_string())),
        Some((path, other)) => Err(format!(
            "stock status ('{}') must be text, got {}",
            path,
            describe(other)
        )),
    }
}

/// 整數型的浮點數不輸出 ".0"
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
