use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdviceError>;

#[derive(Error, Debug)]
pub enum AdviceError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] dataset::DatasetError),

    #[error("Match error: {0}")]
    Match(#[from] matcher::MatchError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] fallback::UpstreamError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod advisor;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod fallback;
pub mod matcher;
pub mod session;
