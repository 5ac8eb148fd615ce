//! RPC error type.
//!
//! Remote handler failures come back as plain message strings; everything
//! else is a local condition on this endpoint. Registry usage errors are not
//! represented here — those are warnings, not failures.

use crate::transport::TransportError;

/// Errors surfaced by RPC calls and broadcasts.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The remote handler threw; carries the original message as a string.
    #[error("{message}")]
    Remote {
        /// Message reported by the remote side.
        message: String,
    },

    /// The endpoint was disposed or the transport closed before settlement.
    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    /// The underlying transport rejected a send.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No handler table is registered for the channel.
    #[error("no handler registered for channel '{channel}'")]
    NoHandler {
        /// Channel the request addressed.
        channel: String,
    },

    /// The channel's table has no such method.
    #[error("method '{method}' not found on channel '{channel}'")]
    MethodNotFound {
        /// Channel the request addressed.
        channel: String,
        /// Method that was looked up.
        method: String,
    },

    /// Arguments could not be decoded into what the handler expects.
    #[error("invalid arguments: {message}")]
    InvalidArgs {
        /// Description of the mismatch.
        message: String,
    },

    /// Envelope or payload (de)serialization failed.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl RpcError {
    /// Invalid-arguments error from any displayable cause.
    #[must_use]
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn remote_error_preserves_message() {
        let err = RpcError::Remote {
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn transport_error_converts() {
        let err = RpcError::from(TransportError::Closed);
        assert_matches!(err, RpcError::Transport(TransportError::Closed));
    }

    #[test]
    fn method_not_found_names_both_parts() {
        let err = RpcError::MethodNotFound {
            channel: "Echo".into(),
            method: "missing".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Echo"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn serde_error_converts() {
        let bad = serde_json::from_str::<serde_json::Value>("{oops");
        let err = RpcError::from(bad.unwrap_err());
        assert!(err.to_string().starts_with("serialization failed"));
    }
}
