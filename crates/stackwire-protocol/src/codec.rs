//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The rest of the stack never touches `serde_json` directly: it goes
//! through [`Codec`], and the snapshot helpers below add the range checks
//! that plain deserialization can't express.

use serde::{de::DeserializeOwned, Serialize};
use stackwire_board::Snapshot;

use crate::{ProtocolError, WireSnapshot};

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` so a codec can live inside the sync engine's
/// shared state and be used from the consumer task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// Encodes a snapshot in its wire shape.
pub fn encode_snapshot<C: Codec>(codec: &C, snapshot: &Snapshot) -> Result<Vec<u8>, ProtocolError> {
    codec.encode(&WireSnapshot::from(snapshot))
}

/// Decodes and validates a snapshot.
///
/// # Errors
/// `Decode` for malformed input, `InvalidMessage` for well-formed input
/// with out-of-range values.
pub fn decode_snapshot<C: Codec>(codec: &C, data: &[u8]) -> Result<Snapshot, ProtocolError> {
    let wire: WireSnapshot = codec.decode(data)?;
    Snapshot::try_from(wire)
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is the format every client of a session already speaks, so this
/// is the only codec. Behind the `json` feature flag (on by default).
///
/// ## Example
///
/// ```rust
/// use stackwire_board::Snapshot;
/// use stackwire_protocol::{decode_snapshot, encode_snapshot, JsonCodec};
///
/// let bytes = encode_snapshot(&JsonCodec, &Snapshot::new()).unwrap();
/// let decoded = decode_snapshot(&JsonCodec, &bytes).unwrap();
/// assert_eq!(decoded, Snapshot::new());
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
    use stackwire_board::{Action, Coord, Player, Role, Size};

    use super::*;

    fn played() -> Snapshot {
        let mut snap = Snapshot::new();
        let c = |r, c| Coord::new(r, c).unwrap();
        snap.play(
            Role::Player(Player::One),
            Action::Place { at: c(0, 0), size: Size::Small },
        )
        .unwrap();
        snap.play(
            Role::Player(Player::Two),
            Action::Place { at: c(0, 0), size: Size::Large },
        )
        .unwrap();
        snap
    }

    #[test]
    fn test_snapshot_round_trip_preserves_stacks() {
        let snap = played();

        let bytes = encode_snapshot(&JsonCodec, &snap).unwrap();
        let decoded = decode_snapshot(&JsonCodec, &bytes).unwrap();

        assert_eq!(decoded, snap);
        assert_eq!(decoded.board().stack(Coord::new(0, 0).unwrap()).len(), 2);
    }

    #[test]
    fn test_snapshot_round_trip_full_board_mixed_stacks() {
        use stackwire_board::{Board, Piece, Stack};

        let p = |owner, size| Piece::new(size, owner);
        let (one, two) = (Player::One, Player::Two);
        let (s, m, l) = (Size::Small, Size::Medium, Size::Large);
        let stack = |pieces: Vec<Piece>| Stack::from_pieces(pieces);
        let board = Board::from_rows([
            [
                stack(vec![p(one, s), p(two, m), p(one, l)]),
                stack(vec![p(two, s)]),
                stack(vec![p(one, m), p(two, l)]),
            ],
            [
                stack(vec![p(two, m)]),
                stack(vec![p(two, s), p(one, m), p(two, l)]),
                stack(vec![p(one, s)]),
            ],
            [
                stack(vec![p(one, l)]),
                stack(vec![p(two, s), p(one, m)]),
                stack(vec![p(one, s), p(two, m)]),
            ],
        ]);
        let snap = Snapshot::from_parts(board, Player::Two, None);

        let bytes = encode_snapshot(&JsonCodec, &snap).unwrap();
        let decoded = decode_snapshot(&JsonCodec, &bytes).unwrap();

        assert_eq!(decoded, snap);
        assert_eq!(decoded.active_player(), Player::Two);
        let center = decoded.board().stack(Coord::new(1, 1).unwrap());
        assert_eq!(center.len(), 3);
        assert_eq!(center.pieces()[0], p(two, s));
        assert_eq!(center.top(), Some(p(two, l)));
        assert!(Coord::all().all(|at| !decoded.board().stack(at).is_empty()));
    }

    #[test]
    fn test_decode_snapshot_garbage_is_decode_error() {
        let result = decode_snapshot(&JsonCodec, b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_snapshot_bad_turn_is_invalid_message() {
        let json = br#"{"Board":[[[],[],[]],[[],[],[]],[[],[],[]]],"PlayerTurn":0,"Winner":0}"#;
        let result = decode_snapshot(&JsonCodec, json);
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }
}
