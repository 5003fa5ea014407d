//! Wire types: what actually travels on the bus.
//!
//! These mirror the domain types in `stackwire-board` but use raw
//! integers, because that's what other clients put on the wire. The
//! conversion into domain types is where value ranges get checked.
//!
//! Field names are PascalCase (`Board`, `PlayerTurn`, `Winner`, `Size`,
//! `Owner`) and objects are matched by field name, so field order doesn't
//! matter.

use serde::{Deserialize, Deserializer, Serialize};
use stackwire_board::{Board, Piece, Player, RuleError, Size, Snapshot, Stack, BOARD_SIZE};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Pieces and stacks
// ---------------------------------------------------------------------------

/// A piece as integers: `{"Size": 1..=3, "Owner": 1..=2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WirePiece {
    pub size: u8,
    pub owner: u8,
}

/// One cell: pieces bottom to top.
///
/// Some clients write an empty cell as `null` rather than `[]`; both
/// decode to an empty stack. Encoding always writes `[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WireStack(pub Vec<WirePiece>);

impl<'de> Deserialize<'de> for WireStack {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pieces = Option::<Vec<WirePiece>>::deserialize(deserializer)?;
        Ok(WireStack(pieces.unwrap_or_default()))
    }
}

// ---------------------------------------------------------------------------
// WireSnapshot
// ---------------------------------------------------------------------------

/// The snapshot message.
///
/// ```json
/// {"Board":[[[{"Size":2,"Owner":1}],[],[]],[[],[],[]],[[],[],[]]],
///  "PlayerTurn":2,"Winner":0}
/// ```
///
/// `Winner` is 0 while nobody has won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireSnapshot {
    pub board: Vec<Vec<WireStack>>,
    pub player_turn: u8,
    pub winner: u8,
}

impl From<&Snapshot> for WireSnapshot {
    fn from(snapshot: &Snapshot) -> Self {
        let board = snapshot
            .board()
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|stack| {
                        WireStack(
                            stack
                                .pieces()
                                .iter()
                                .map(|p| WirePiece {
                                    size: p.size.value(),
                                    owner: p.owner.number(),
                                })
                                .collect(),
                        )
                    })
                    .collect()
            })
            .collect();

        Self {
            board,
            player_turn: snapshot.active_player().number(),
            winner: snapshot.winner().map_or(0, Player::number),
        }
    }
}

impl TryFrom<WireSnapshot> for Snapshot {
    type Error = ProtocolError;

    fn try_from(wire: WireSnapshot) -> Result<Self, Self::Error> {
        if wire.board.len() != BOARD_SIZE {
            return Err(invalid(format!(
                "board has {} rows, expected {BOARD_SIZE}",
                wire.board.len()
            )));
        }

        let mut rows: [[Stack; BOARD_SIZE]; BOARD_SIZE] = Default::default();
        for (r, wire_row) in wire.board.into_iter().enumerate() {
            if wire_row.len() != BOARD_SIZE {
                return Err(invalid(format!(
                    "row {r} has {} cells, expected {BOARD_SIZE}",
                    wire_row.len()
                )));
            }
            for (c, WireStack(pieces)) in wire_row.into_iter().enumerate() {
                let pieces = pieces
                    .into_iter()
                    .map(|p| {
                        let size = Size::try_from(p.size).map_err(|e| invalid_at(r, c, e))?;
                        let owner = Player::try_from(p.owner).map_err(|e| invalid_at(r, c, e))?;
                        Ok(Piece::new(size, owner))
                    })
                    .collect::<Result<Vec<_>, ProtocolError>>()?;
                rows[r][c] = Stack::from_pieces(pieces);
            }
        }

        let active = Player::try_from(wire.player_turn)
            .map_err(|_| invalid(format!("PlayerTurn must be 1 or 2, got {}", wire.player_turn)))?;
        let winner = match wire.winner {
            0 => None,
            n => Some(
                Player::try_from(n)
                    .map_err(|_| invalid(format!("Winner must be 0, 1 or 2, got {n}")))?,
            ),
        };

        Ok(Snapshot::from_parts(Board::from_rows(rows), active, winner))
    }
}

// ---------------------------------------------------------------------------
// RoleClaim
// ---------------------------------------------------------------------------

/// A client's claim on a player role: `{"Role": 1, "ClientId": "..."}`.
///
/// Published retained on `<topic>/roles/<n>`. An empty retained payload
/// on that topic means the role is free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleClaim {
    pub role: u8,
    pub client_id: String,
}

impl RoleClaim {
    pub fn new(player: Player, client_id: impl Into<String>) -> Self {
        Self {
            role: player.number(),
            client_id: client_id.into(),
        }
    }

    /// The claimed player, if the role number is valid.
    pub fn player(&self) -> Result<Player, ProtocolError> {
        Player::try_from(self.role)
            .map_err(|_| invalid(format!("claimed role must be 1 or 2, got {}", self.role)))
    }
}

fn invalid(msg: String) -> ProtocolError {
    ProtocolError::InvalidMessage(msg)
}

fn invalid_at(row: usize, col: usize, err: RuleError) -> ProtocolError {
    invalid(format!("cell [{row},{col}]: {err}"))
}

#[cfg(all(test, feature = "json"))]
mod tests {
    //! These check the exact JSON shape, since other clients depend on it.

    use stackwire_board::{Action, Coord, Role};

    use super::*;

    fn decode(json: &str) -> Result<Snapshot, ProtocolError> {
        let wire: WireSnapshot = serde_json::from_str(json).unwrap();
        Snapshot::try_from(wire)
    }

    const EMPTY_BOARD: &str = "[[[],[],[]],[[],[],[]],[[],[],[]]]";

    // =========================================================================
    // Encoding
    // =========================================================================

    #[test]
    fn test_wire_snapshot_new_session_json_format() {
        let json = serde_json::to_value(WireSnapshot::from(&Snapshot::new())).unwrap();

        assert_eq!(json["PlayerTurn"], 1);
        assert_eq!(json["Winner"], 0);
        assert_eq!(json["Board"].as_array().unwrap().len(), 3);
        assert_eq!(json["Board"][2][2], serde_json::json!([]));
    }

    #[test]
    fn test_wire_snapshot_piece_fields_are_pascal_case() {
        let mut snap = Snapshot::new();
        snap.play(
            Role::Player(Player::One),
            Action::Place {
                at: Coord::new(0, 1).unwrap(),
                size: Size::Medium,
            },
        )
        .unwrap();

        let json = serde_json::to_value(WireSnapshot::from(&snap)).unwrap();

        assert_eq!(json["Board"][0][1], serde_json::json!([{"Size": 2, "Owner": 1}]));
        assert_eq!(json["PlayerTurn"], 2);
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    #[test]
    fn test_decode_field_order_independent() {
        let a = format!(r#"{{"Board":{EMPTY_BOARD},"PlayerTurn":2,"Winner":0}}"#);
        let b = format!(r#"{{"Winner":0,"PlayerTurn":2,"Board":{EMPTY_BOARD}}}"#);

        assert_eq!(decode(&a).unwrap(), decode(&b).unwrap());
        assert_eq!(decode(&a).unwrap().active_player(), Player::Two);
    }

    #[test]
    fn test_decode_null_cells_are_empty_stacks() {
        let json = r#"{"Board":[[null,null,null],[null,null,null],[null,null,null]],"PlayerTurn":1,"Winner":0}"#;
        let snap = decode(json).unwrap();
        assert!(snap.board().is_empty());
    }

    #[test]
    fn test_decode_winner_maps_to_player() {
        let json = format!(r#"{{"Board":{EMPTY_BOARD},"PlayerTurn":1,"Winner":2}}"#);
        assert_eq!(decode(&json).unwrap().winner(), Some(Player::Two));
    }

    #[test]
    fn test_decode_size_out_of_range_rejected() {
        let json = r#"{"Board":[[[{"Size":4,"Owner":1}],[],[]],[[],[],[]],[[],[],[]]],"PlayerTurn":1,"Winner":0}"#;
        let err = decode(json).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(ref m) if m.contains("[0,0]")));
    }

    #[test]
    fn test_decode_owner_out_of_range_rejected() {
        let json = r#"{"Board":[[[],[],[]],[[],[{"Size":1,"Owner":3}],[]],[[],[],[]]],"PlayerTurn":1,"Winner":0}"#;
        assert!(matches!(decode(json), Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_winner_out_of_range_rejected() {
        let json = format!(r#"{{"Board":{EMPTY_BOARD},"PlayerTurn":1,"Winner":3}}"#);
        assert!(matches!(decode(&json), Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_wrong_shape_rejected() {
        let two_rows = r#"{"Board":[[[],[],[]],[[],[],[]]],"PlayerTurn":1,"Winner":0}"#;
        let short_row = r#"{"Board":[[[],[]],[[],[],[]],[[],[],[]]],"PlayerTurn":1,"Winner":0}"#;

        assert!(matches!(decode(two_rows), Err(ProtocolError::InvalidMessage(_))));
        assert!(matches!(decode(short_row), Err(ProtocolError::InvalidMessage(_))));
    }

    // =========================================================================
    // RoleClaim
    // =========================================================================

    #[test]
    fn test_role_claim_json_format() {
        let claim = RoleClaim::new(Player::Two, "a1b2");
        let json = serde_json::to_value(&claim).unwrap();
        assert_eq!(json, serde_json::json!({"Role": 2, "ClientId": "a1b2"}));
    }

    #[test]
    fn test_role_claim_bad_role_rejected() {
        let claim: RoleClaim = serde_json::from_str(r#"{"Role":3,"ClientId":"x"}"#).unwrap();
        assert!(claim.player().is_err());
    }
}
