//! Top-level error taxonomy. One domain-specific enum per failure class;
//! only [`StartupError`] is ever fatal to the running loop.

use thiserror::Error;

pub use crate::wire::WireError;

/// Per-frame wire parsing failures. Local to the frame; never propagate
/// to the loop.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WireFrameError {
    #[error("frame too short")]
    TooShort,
    #[error("unexpected frame format")]
    UnexpectedFormat,
    #[error("unexpected frame type")]
    UnexpectedType,
    #[error("unexpected field value")]
    UnexpectedValue,
}

impl From<WireError> for WireFrameError {
    fn from(_: WireError) -> Self {
        WireFrameError::TooShort
    }
}

/// Reasons an RX frame was silently dropped. These are accounted for in
/// statistics but never surfaced as warnings (they're expected traffic,
/// not errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxBenign {
    IgnorePeer,
    IgnoreRssi,
    IgnoreFailedCrc,
    IgnoreNoPromisc,
    IgnoreFromSelf,
    Ignore,
}

/// The outcome of parsing one RX frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RxOutcome {
    /// An action frame was consumed and peer/sync/election state updated.
    Action,
    /// A data frame decoded into exactly one Ethernet-equivalent frame,
    /// available to the caller via the output buffer it supplied.
    Data,
    Benign(RxBenign),
    WireError(WireFrameError),
}

#[derive(Debug, Error)]
pub enum TxError {
    #[error("frame injection failed")]
    TxFail,
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer already present, timestamp updated")]
    Update,
    #[error("new peer created")]
    Ok,
    #[error("peer not found")]
    Missing,
    #[error("internal peer-table error")]
    Internal,
}

/// Platform setup failures. Fatal: the process exits on these.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open wireless device: {0}")]
    WlanOpen(String),
    #[error("failed to open host device: {0}")]
    HostOpen(String),
    #[error("failed to configure monitor mode: {0}")]
    MonitorMode(String),
    #[error("failed to set channel: {0}")]
    SetChannel(String),
    #[error("platform call returned an error: {0}")]
    Platform(String),
}

#[derive(Debug, Error)]
pub enum AwdlError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
