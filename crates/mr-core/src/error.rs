use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Resource,
    Parse,
    Execution,
    InvalidArgument,
    Disposed,
    Busy,
    Host,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Parse => "parse",
            Self::Execution => "execution",
            Self::InvalidArgument => "invalid_argument",
            Self::Disposed => "disposed",
            Self::Busy => "busy",
            Self::Host => "host",
        }
    }

    pub fn is_recoverable(self) -> bool {
        !matches!(self, Self::Resource | Self::Disposed)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct RacerError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
}

impl RacerError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn resource(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resource, code, message)
    }

    pub fn parse() -> Self {
        Self::new(ErrorKind::Parse, "EVAL_PARSE_ERROR", "Error parsing script.")
    }

    pub fn execution() -> Self {
        Self::new(
            ErrorKind::Execution,
            "EVAL_EXECUTION_ERROR",
            "Script execution failed.",
        )
    }

    pub fn terminated() -> Self {
        Self::new(
            ErrorKind::Execution,
            "EVAL_TERMINATED",
            "Script execution was terminated.",
        )
    }

    pub fn invalid_argument(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, code, message)
    }

    pub fn disposed() -> Self {
        Self::new(
            ErrorKind::Disposed,
            "ENGINE_DISPOSED",
            "Engine instance has been disposed.",
        )
    }

    pub fn busy() -> Self {
        Self::new(
            ErrorKind::Busy,
            "ENGINE_BUSY",
            "Engine instance has an evaluation in progress.",
        )
    }

    pub fn host(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Host, code, message)
    }
}
