//! Channel-layer error taxonomy

use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong between a send and its reply.
///
/// Clone-able because one transport fault fails every pending request
/// with the same error.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// Send attempted while the channel was not in the connected state.
    #[error("channel is not connected")]
    NotConnected,

    /// The inbound frame paired with a request could not be parsed as
    /// the expected reply shape.
    #[error("malformed reply: {reason} (payload: {payload_preview})")]
    MalformedResponse {
        reason: String,
        payload_preview: String,
    },

    /// The underlying transport faulted.
    #[error("transport error: {0}")]
    Transport(String),

    /// The connection closed, locally or remotely, while the request
    /// was pending.
    #[error("channel closed while the request was pending")]
    Closed,

    /// No reply arrived within the request deadline. The queue slot is
    /// released; the channel itself stays up.
    #[error("no reply within {0:?}")]
    Timeout(Duration),
}
