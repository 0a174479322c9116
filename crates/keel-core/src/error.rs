//! Error types for Keel

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Bank provider error: {0}")]
    Provider(String),

    #[error("Bank account is not connected")]
    NotConnected,

    #[error("Insight service error: {0}")]
    InsightUnavailable(String),

    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    #[error("Invalid link transition: {0}")]
    InvalidTransition(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
