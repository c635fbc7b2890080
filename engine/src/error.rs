use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Network failure or non-2xx/API error code from an exchange endpoint.
    #[error("Upstream fetch error from {provider}: {message}")]
    TransientFetch { provider: String, message: String },

    #[error("Request to {provider} timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },

    #[error("Malformed market data: {0}")]
    MalformedData(String),

    #[error("No market data: {0}")]
    NoData(String),

    #[error("Analysis store error: {0}")]
    StorageError(String),

    #[error("CSV system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },
}

impl EngineError {
    /// Failures scoped to one (symbol, timeframe) unit. The analyzer logs and
    /// skips these instead of failing the whole request.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            EngineError::TransientFetch { .. }
                | EngineError::Timeout { .. }
                | EngineError::MalformedData(_)
                | EngineError::NoData(_)
        )
    }

    pub fn transient(provider: &str, err: impl std::fmt::Display) -> Self {
        EngineError::TransientFetch {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
