//! Error types
//!
//! Errors are split by origin: `LinkError` for failures reported by the
//! device link, `FrameError` for invalid caller input rejected at the call
//! site. Backpressure drops and lifecycle races are not errors (see the
//! engine docs) and never appear here.

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for device link send operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The link is not connected
    NotConnected,
    /// The link accepted the message but the write failed
    Write(String),
    /// The link did not complete the write within its own timeout
    Timeout,
}

impl std::fmt::Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkError::NotConnected => write!(f, "Link not connected"),
            LinkError::Write(reason) => write!(f, "Link write failed: {}", reason),
            LinkError::Timeout => write!(f, "Link write timed out"),
        }
    }
}

impl std::error::Error for LinkError {}

/// Error type for invalid frame submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Frame payload is empty
    EmptyPayload,
    /// SPS or PPS parameter set is empty
    EmptyParameterSet,
    /// Key or delta frame submitted before any SPS/PPS configuration
    MissingConfig,
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::EmptyPayload => write!(f, "Frame payload is empty"),
            FrameError::EmptyParameterSet => write!(f, "SPS/PPS parameter set is empty"),
            FrameError::MissingConfig => {
                write!(f, "Frame submitted before decoder configuration")
            }
        }
    }
}

impl std::error::Error for FrameError {}

/// Top-level error for engine operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Device link failure
    Link(LinkError),
    /// Invalid frame submission
    Frame(FrameError),
    /// `start()` called while a session is already active
    AlreadyStreaming,
    /// Target bitrate must be positive
    ZeroBitrate,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Link(e) => write!(f, "{}", e),
            Error::Frame(e) => write!(f, "{}", e),
            Error::AlreadyStreaming => write!(f, "A streaming session is already active"),
            Error::ZeroBitrate => write!(f, "Target bitrate must be positive"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Link(e) => Some(e),
            Error::Frame(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Error::Link(e)
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Error::Frame(e)
    }
}
