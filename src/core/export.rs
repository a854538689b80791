use crate::core::Storage;
use crate::domain::model::Product;
use crate::utils::error::{EtlError, Result};

pub const CSV_HEADER: [&str; 5] = ["Name", "SKU", "Price", "Stock Status", "Source"];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 以 UTF-8 輸出 CSV，寫入後重新讀取驗證筆數
#[derive(Debug, Clone, Copy)]
pub struct CsvExporter {
    utf8_bom: bool,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self { utf8_bom: true }
    }
}

impl CsvExporter {
    pub fn new(utf8_bom: bool) -> Self {
        Self { utf8_bom }
    }

    pub fn render(&self, products: &[Product]) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        if self.utf8_bom {
            buffer.extend_from_slice(UTF8_BOM);
        }

        let mut writer = csv::Writer::from_writer(buffer);
        writer.write_record(CSV_HEADER)?;
        for product in products {
            let price = format!("{:.2}", product.price());
            writer.write_record([
                product.name(),
                product.sku(),
                price.as_str(),
                product.stock_status().label(),
                product.source(),
            ])?;
        }

        writer
            .into_inner()
            .map_err(|e| EtlError::ProcessingError {
                message: format!("Cannot flush CSV buffer: {}", e),
            })
    }

    /// 回傳資料列數；表頭不符或任何一列格式錯誤都視為失敗
    pub fn verify(data: &[u8], expected_rows: usize) -> std::result::Result<usize, String> {
        if data.is_empty() {
            return Err("written file is empty".to_string());
        }

        let body = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(body);

        let headers = reader
            .headers()
            .map_err(|e| format!("cannot read header row: {}", e))?;
        if headers.iter().ne(CSV_HEADER.iter().copied()) {
            return Err(format!("unexpected header row: {:?}", headers));
        }

        let mut rows = 0;
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| format!("row {} is unreadable: {}", index + 1, e))?;
            if record.len() != CSV_HEADER.len() {
                return Err(format!(
                    "row {} has {} columns, expected {}",
                    index + 1,
                    record.len(),
                    CSV_HEADER.len()
                ));
            }
            rows += 1;
        }

        if rows != expected_rows {
            return Err(format!(
                "row count mismatch: wrote {} products but found {} rows",
                expected_rows, rows
            ));
        }
        Ok(rows)
    }

    pub async fn export<S: Storage>(
        &self,
        storage: &S,
        products: &[Product],
        target_path: &str,
    ) -> Result<String> {
        let export_error = |message: String| EtlError::ExportError {
            path: target_path.to_string(),
            message,
        };

        if products.is_empty() {
            return Err(export_error("refusing to write a report without products".to_string()));
        }

        let data = self.render(products)?;
        tracing::debug!("💾 Writing CSV ({} bytes) to {}", data.len(), target_path);
        storage
            .write_file(target_path, &data)
            .await
            .map_err(|e| export_error(format!("write failed: {}", e)))?;

        let written = storage
            .read_file(target_path)
            .await
            .map_err(|e| export_error(format!("cannot re-open for verification: {}", e)))?;
        let rows = match Self::verify(&written, products.len()) {
            Ok(rows) => rows,
            Err(message) => {
                // 驗證失敗的報表不可留在目標路徑
                if let Err(e) = storage.remove_file(target_path).await {
                    tracing::warn!("⚠️ Cannot remove unverified report {}: {}", target_path, e);
                }
                return Err(export_error(message));
            }
        };

        tracing::info!("✅ CSV verified: {} rows at {}", rows, target_path);
        Ok(target_path.to_string())
    }
}
