use crate::domain::model::{BatchStatistics, DedupPolicy, Product, RawRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 目錄下（不遞迴）符合副檔名的檔案，依檔名排序
    fn list_files(
        &self,
        dir: &str,
        extension: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn file_size(&self, path: &str) -> impl std::future::Future<Output = Result<u64>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_directory(&self) -> &str;
    fn output_directory(&self) -> &str;
    /// 檔名樣板，`{date}` 會替換成執行日期
    fn csv_filename(&self) -> &str;
    fn max_file_size_bytes(&self) -> u64;
    fn dedup_policy(&self) -> DedupPolicy;
    fn utf8_bom(&self) -> bool;
    fn write_summary(&self) -> bool;
    fn in_stock_patterns(&self) -> &[String];
    fn out_of_stock_patterns(&self) -> &[String];
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self, input: &str, stats: &mut BatchStatistics) -> Result<Vec<RawRecord>>;
    async fn transform(
        &self,
        records: Vec<RawRecord>,
        stats: &mut BatchStatistics,
    ) -> Result<Vec<Product>>;
    async fn load(&self, products: Vec<Product>, stats: &mut BatchStatistics) -> Result<String>;
}
