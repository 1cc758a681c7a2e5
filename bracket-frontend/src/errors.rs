use bracket_engine::EngineError;
use bracket_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("未知的产品 SKU：{sku}")]
    UnknownSku { sku: String },
    #[error("未指定 SKU，且目录中没有默认 SKU")]
    NoDefaultSku,
    #[error(transparent)]
    Read(#[from] IoError),
    #[error(transparent)]
    Pipeline(#[from] EngineError),
}
