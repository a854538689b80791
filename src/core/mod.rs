pub mod etl;
pub mod export;
pub mod extractor;
pub mod price;
pub mod producer;
pub mod stock;
pub mod transformer;

pub use crate::domain::model::{BatchStatistics, Product, RawRecord, StockStatus, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
