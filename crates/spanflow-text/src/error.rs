use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyzerError {
    #[error("unknown analyzer '{0}' (expected 'standard' or 'simple')")]
    Unknown(String),
}
