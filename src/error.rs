use crate::coord::Location;
use thiserror::Error;

/// Errors surfaced by the shop core. User-input problems and capacity
/// shortfalls are not errors; the pipelines report those as notices.
#[derive(Debug, Error)]
pub enum ShopError {
    /// Backing container is gone or unreachable
    #[error("shop at {0:?} has no usable container")]
    InvalidShop(Location),

    #[error("no shop at {0:?}")]
    NotFound(Location),

    #[error("cursor has no current element")]
    NoCurrent,

    #[error("economy refused: {0}")]
    Economy(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("bad item config: {0}")]
    ItemConfig(#[from] serde_json::Error),

    #[error("bad owner id: {0}")]
    OwnerId(#[from] uuid::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
