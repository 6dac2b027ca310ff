//! Connection lifecycle state

/// Where the channel currently stands. Exactly one value holds at any
/// time; transitions are driven solely by channel lifecycle events,
/// never set directly by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Dialing the backend; no frame has been exchanged yet.
    Connecting,
    /// Handshake complete; sends are accepted.
    Connected,
    /// A supervised channel lost its connection and is redialing.
    Reconnecting,
    /// The connection closed, locally or remotely. Terminal for a bare
    /// channel instance.
    Disconnected,
    /// The transport faulted. Terminal for a bare channel instance.
    Error,
}

impl ConnectionState {
    /// Whether this state ends the life of a single physical connection.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Error)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}
