/// The state of a protocol connection.
///
/// Handshake leads to either Status or Login; Login leads to Play, which is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Handshaking,
    Status,
    Login,
    Play,
}

impl ConnectionState {
    pub fn from_handshake_next(next: i32) -> Option<Self> {
        match next {
            1 => Some(ConnectionState::Status),
            2 => Some(ConnectionState::Login),
            _ => None,
        }
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        matches!(
            (self, next),
            (ConnectionState::Handshaking, ConnectionState::Status)
                | (ConnectionState::Handshaking, ConnectionState::Login)
                | (ConnectionState::Login, ConnectionState::Play)
        )
    }

    pub(crate) fn index(self) -> usize {
        match self {
            ConnectionState::Handshaking => 0,
            ConnectionState::Status => 1,
            ConnectionState::Login => 2,
            ConnectionState::Play => 3,
        }
    }
}
