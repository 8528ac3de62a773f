use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("fragment store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;
