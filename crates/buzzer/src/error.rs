//! Unified error type for the Buzzer server.

use buzzer_protocol::ProtocolError;
use buzzer_room::RoomError;
use buzzer_session::SessionError;
use buzzer_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// Connection handlers return this; any variant ends the connection and
/// runs the usual disconnect cleanup.
#[derive(Debug, thiserror::Error)]
pub enum BuzzerError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room actor could not be reached.
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use buzzer_protocol::{PlayerId, RoomCode};

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let buzzer_err: BuzzerError = err.into();
        assert!(matches!(buzzer_err, BuzzerError::Transport(_)));
        assert!(buzzer_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let buzzer_err: BuzzerError = err.into();
        assert!(matches!(buzzer_err, BuzzerError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::AlreadyBound(PlayerId(3), RoomCode::parse("A7F3").unwrap());
        let buzzer_err: BuzzerError = err.into();
        assert!(matches!(buzzer_err, BuzzerError::Session(_)));
        assert!(buzzer_err.to_string().contains("P-3"));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomCode::parse("A7F3").unwrap());
        let buzzer_err: BuzzerError = err.into();
        assert!(matches!(buzzer_err, BuzzerError::Room(_)));
        assert!(buzzer_err.to_string().contains("A7F3"));
    }
}
