use thiserror::Error;

/// Why a single fetch did not produce a payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {status}")]
    Status { status: u16 },

    #[error("failed reading body: {0}")]
    Body(String),

    #[error("fetch cancelled")]
    Cancelled,

    #[error("fetch panicked: {0}")]
    Panicked(String),
}

/// Terminal outcome of one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { payload: Vec<u8> },
    Failure { error: FetchError },
}

impl FetchOutcome {
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        FetchOutcome::Success {
            payload: payload.into(),
        }
    }

    pub fn failure(error: FetchError) -> Self {
        FetchOutcome::Failure { error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            FetchOutcome::Success { payload } => Some(payload),
            FetchOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchOutcome::Success { .. } => None,
            FetchOutcome::Failure { error } => Some(error),
        }
    }
}

impl From<Result<Vec<u8>, FetchError>> for FetchOutcome {
    fn from(result: Result<Vec<u8>, FetchError>) -> Self {
        match result {
            Ok(payload) => FetchOutcome::Success { payload },
            Err(error) => FetchOutcome::Failure { error },
        }
    }
}
