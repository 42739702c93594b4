//! Domain error types.

/// Top-level error type for momtrader.
#[derive(Debug, thiserror::Error)]
pub enum MomtraderError {
    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error("insufficient history for {subject}: have {have}, need {need}")]
    InsufficientHistory {
        subject: String,
        have: usize,
        need: usize,
    },

    #[error("malformed position book entry {ticker}: {reason}")]
    MalformedBook { ticker: String, reason: String },

    #[error("invalid price for {ticker}: {price}")]
    InvalidPrice { ticker: String, price: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MomtraderError {
    /// Faults raised by the decision logic itself rather than a collaborator.
    pub fn is_engine_fault(&self) -> bool {
        matches!(
            self,
            MomtraderError::MalformedBook { .. } | MomtraderError::InvalidPrice { .. }
        )
    }
}

impl From<&MomtraderError> for std::process::ExitCode {
    fn from(err: &MomtraderError) -> Self {
        let code: u8 = match err {
            MomtraderError::Io(_) => 1,
            MomtraderError::ConfigParse { .. }
            | MomtraderError::ConfigMissing { .. }
            | MomtraderError::ConfigInvalid { .. }
            | MomtraderError::Universe(_) => 2,
            MomtraderError::Storage { .. } => 3,
            MomtraderError::DataSource { .. } => 4,
            MomtraderError::NoData { .. } | MomtraderError::InsufficientHistory { .. } => 5,
            MomtraderError::MalformedBook { .. } | MomtraderError::InvalidPrice { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

/// Errors raised while building a universe from a ticker list.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),

    #[error("universe is empty")]
    Empty,
}

/// Delivery failure of a notification. Never propagated out of a cycle.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport error: {0}")]
    Transport(String),

    #[error("notification rejected with status {status}")]
    Rejected { status: u16 },
}
