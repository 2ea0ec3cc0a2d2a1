//! Codec trait and implementations for serializing frames.
//!
//! The server never calls serde directly; it goes through a [`Codec`] so
//! the wire format can change without touching the connection handler.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to frame bytes and decodes them back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Frames are UTF-8 JSON, which the WebSocket transport sends as text
/// frames so browser clients can `JSON.parse` them directly.
///
/// ```rust
/// use buzzer_protocol::{ClientEvent, Codec, JsonCodec, Request};
///
/// let codec = JsonCodec;
/// let req: Request = codec
///     .decode(br#"{"ack": 1, "event": {"name": "buzz"}}"#)
///     .unwrap();
/// assert_eq!(req.ack, Some(1));
/// assert_eq!(req.event, ClientEvent::Buzz);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Envelope, Payload, PlayerId};

    #[test]
    fn test_json_codec_encodes_utf8() {
        let env = Envelope {
            seq: 1,
            timestamp: 0,
            payload: Payload::Hello {
                player_id: PlayerId(3),
                version: 1,
            },
        };
        let bytes = JsonCodec.encode(&env).unwrap();
        assert!(std::str::from_utf8(&bytes).is_ok());
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<Envelope, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
