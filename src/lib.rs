pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use config::toml_config::TomlConfig;
pub use core::{etl::EtlEngine, producer::BatchProducer};
pub use domain::model::{BatchStatistics, DedupPolicy, Product, StockStatus};
pub use utils::error::{EtlError, Result};
