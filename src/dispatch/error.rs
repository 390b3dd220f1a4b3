//! Error channels for connection dispatch.
//!
//! Dispatch distinguishes two failure channels so callers can tell "your
//! template is broken" from "the network call failed": render-stage errors
//! never reach the transport boundary and never change lifecycle state,
//! while transport errors return the lifecycle to idle.

use std::fmt;

use crate::render::RenderError;

/// Connection-level failures reported by the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established.
    ConnectionFailed(String),

    /// The protocol handshake was rejected.
    HandshakeFailed(String),

    /// The peer or transport closed the connection unexpectedly.
    ConnectionClosed(String),

    /// The transport did not respond in time.
    Timeout,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            TransportError::HandshakeFailed(msg) => write!(f, "Handshake failed: {}", msg),
            TransportError::ConnectionClosed(msg) => write!(f, "Connection closed: {}", msg),
            TransportError::Timeout => write!(f, "Transport timed out"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Either of the two dispatch failure channels.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Request preparation failed; the transport was never reached.
    Render(RenderError),

    /// The transport reported a connection-level failure.
    Transport(TransportError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Render(err) => write!(f, "Render error: {}", err),
            DispatchError::Transport(err) => write!(f, "Transport error: {}", err),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Render(err) => Some(err),
            DispatchError::Transport(err) => Some(err),
        }
    }
}

impl From<RenderError> for DispatchError {
    fn from(err: RenderError) -> Self {
        DispatchError::Render(err)
    }
}

impl From<TransportError> for DispatchError {
    fn from(err: TransportError) -> Self {
        DispatchError::Transport(err)
    }
}
