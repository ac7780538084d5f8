use std::{fmt::Display, time::Duration};

use thiserror::Error;

/// coarse classification of a failure, shared by [`PrinterError`] and the error registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// the byte channel could not be used or the device never answered a link probe
    Transport,
    /// a physical condition of the device (paper, cover, mechanism, battery)
    Device,
    /// the device rejected or garbled a command
    Protocol,
    /// the request itself cannot be expressed for this device
    Logic,
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Transport => write!(f, "transport"),
            ErrorCategory::Device => write!(f, "device"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::Logic => write!(f, "logic"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PrinterError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timeout after {elapsed:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: &'static str,
        elapsed: Duration,
    },

    #[error("checksum mismatch, expected {expected} received {received}")]
    Checksum { expected: String, received: String },

    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),

    #[error("device fault: {0}")]
    DeviceFault(String),

    #[error("device reported error {code} in {command}: {text}")]
    ProtocolFault {
        command: String,
        code: i32,
        text: &'static str,
    },

    #[error("unexpected response to {command}: {response}")]
    UnexpectedResponse { command: String, response: String },

    #[error("{0}")]
    Logic(String),
}

impl PrinterError {
    /// the category this error is reported under
    pub fn category(&self) -> ErrorCategory {
        match self {
            PrinterError::Transport(_) | PrinterError::Io(_) => ErrorCategory::Transport,
            // a missing reply is a link problem, the deadline only tells how long we waited
            PrinterError::Timeout { .. } => ErrorCategory::Transport,
            PrinterError::DeviceFault(_) => ErrorCategory::Device,
            PrinterError::Checksum { .. }
            | PrinterError::MalformedFrame(_)
            | PrinterError::ProtocolFault { .. }
            | PrinterError::UnexpectedResponse { .. } => ErrorCategory::Protocol,
            PrinterError::Logic(_) => ErrorCategory::Logic,
        }
    }

    pub(crate) fn no_communication() -> Self {
        PrinterError::Transport(String::from("no communication with device"))
    }
}

pub type Result<T> = std::result::Result<T, PrinterError>;
