use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Invalid colour: {0}")]
    InvalidColour(String),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
