use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid pipeline: {0}")]
    Invalid(String),

    #[error(transparent)]
    Core(#[from] spanflow_core::error::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;
