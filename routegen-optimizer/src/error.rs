//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::process::ExitStatus;

use tracing::{error, warn};

use crate::packet::DecodeError;
use crate::target::TargetKey;

// Route optimizer errors.
//
// None of these stop the control loop: probe failures become lost attempts
// and alert failures are only reported.
#[derive(Debug)]
pub enum Error {
    // I/O errors
    IoError(TargetKey, IoError),
    // Probe input
    EchoDecodeError(TargetKey, DecodeError),
    ProbeTaskFailed(tokio::task::JoinError),
    // Alerting
    AlertScriptSpawn(String, std::io::Error),
    AlertScriptStatus(String, ExitStatus),
}

// Probe socket errors.
#[derive(Debug)]
pub enum IoError {
    SocketError(std::io::Error),
    SendError(std::io::Error),
    RecvError(std::io::Error),
}

// ===== impl Error =====

impl Error {
    pub(crate) fn log(&self) {
        match self {
            Error::IoError(target, error) => {
                warn!(path = %target, error = %with_source(error), "{}", self);
            }
            Error::EchoDecodeError(target, error) => {
                warn!(path = %target, %error, "{}", self);
            }
            Error::ProbeTaskFailed(error) => {
                error!(%error, "{}", self);
            }
            Error::AlertScriptSpawn(script, error) => {
                warn!(%script, %error, "{}", self);
            }
            Error::AlertScriptStatus(script, status) => {
                warn!(%script, %status, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(_, error) => error.fmt(f),
            Error::EchoDecodeError(..) => {
                write!(f, "failed to decode echo reply")
            }
            Error::ProbeTaskFailed(..) => {
                write!(f, "probe task failed")
            }
            Error::AlertScriptSpawn(..) => {
                write!(f, "failed to run alert script")
            }
            Error::AlertScriptStatus(..) => {
                write!(f, "alert script failed")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(_, error) => Some(error),
            Error::EchoDecodeError(_, error) => Some(error),
            Error::ProbeTaskFailed(error) => Some(error),
            Error::AlertScriptSpawn(_, error) => Some(error),
            _ => None,
        }
    }
}

// ===== impl IoError =====

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::SocketError(..) => {
                write!(f, "failed to create probe socket")
            }
            IoError::SendError(..) => {
                write!(f, "failed to send echo request")
            }
            IoError::RecvError(..) => {
                write!(f, "failed to receive echo reply")
            }
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoError::SocketError(error)
            | IoError::SendError(error)
            | IoError::RecvError(error) => Some(error),
        }
    }
}

// ===== global functions =====

fn with_source<E: std::error::Error>(error: E) -> String {
    if let Some(source) = error.source() {
        format!("{} ({})", error, with_source(source))
    } else {
        error.to_string()
    }
}
