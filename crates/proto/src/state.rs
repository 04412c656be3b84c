//! The four (plus terminal) connection states a session moves through.

/// Connection state, per §4.7 of the protocol spec. `Handshake` is the
/// initial state, `Closing` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Handshake,
    Status,
    Login,
    Configuration,
    Play,
    Closing,
}

impl ConnectionState {
    /// `true` once the session has entered the terminal state and should be
    /// reaped by the server loop.
    pub fn is_closing(self) -> bool {
        matches!(self, ConnectionState::Closing)
    }
}
