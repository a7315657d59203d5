//! Domain error types.

/// Top-level error type for tearsheet.
#[derive(Debug, thiserror::Error)]
pub enum TearsheetError {
    #[error("usage error: {reason}")]
    Usage { reason: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("positions table is empty")]
    EmptyPositions,

    #[error("returns series is empty")]
    EmptyReturns,

    #[error("csv error in {file}: {reason}")]
    Csv { file: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("render error: {reason}")]
    Render { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TearsheetError {
    pub fn usage(reason: impl Into<String>) -> Self {
        TearsheetError::Usage {
            reason: reason.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        TearsheetError::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<&TearsheetError> for std::process::ExitCode {
    fn from(err: &TearsheetError) -> Self {
        let code: u8 = match err {
            TearsheetError::Io(_) | TearsheetError::Render { .. } => 1,
            TearsheetError::ConfigParse { .. } | TearsheetError::ConfigInvalid { .. } => 2,
            TearsheetError::Csv { .. } => 3,
            TearsheetError::Usage { .. } => 4,
            TearsheetError::InvalidInput { .. }
            | TearsheetError::EmptyPositions
            | TearsheetError::EmptyReturns
            | TearsheetError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
