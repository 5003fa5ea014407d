//! Session identity: which game, which topic, which role.
//!
//! A session is one game. Every client of that game derives the same bus
//! topic from the session id, so nothing but the id has to be shared out
//! of band.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use stackwire_board::{Player, Role};

use crate::SessionError;

/// Topic prefix used when no namespace is configured.
pub const DEFAULT_NAMESPACE: &str = "gobblet/game";

/// Length of a session id.
pub const SESSION_ID_LEN: usize = 5;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A validated five-digit game id, e.g. `12345`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Accepts exactly five ASCII digits. Surrounding whitespace (a
    /// trailing newline from a terminal read) is trimmed first.
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        let trimmed = input.trim();
        if trimmed.len() != SESSION_ID_LEN || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SessionError::InvalidSessionId(input.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `"<namespace>/<session id>"`. Pure: the same inputs always give the
/// same topic, on every client.
pub fn resolve_topic(namespace: &str, id: &SessionId) -> String {
    format!("{}/{}", namespace.trim_end_matches('/'), id)
}

/// Where claims on `player`'s role live for a session topic.
pub fn role_claim_topic(topic: &str, player: Player) -> String {
    format!("{topic}/roles/{}", player.number())
}

/// Maps terminal input to a role: `1`, `2`, or `3` for an observer.
pub fn resolve_role(input: &str) -> Result<Role, SessionError> {
    match input.trim() {
        "1" => Ok(Role::Player(Player::One)),
        "2" => Ok(Role::Player(Player::Two)),
        "3" => Ok(Role::Observer),
        _ => Err(SessionError::InvalidRole(input.to_string())),
    }
}

/// A random 16-character lowercase hex id (64 bits).
///
/// Only used to tell claimants apart; it is not a secret.
pub fn generate_client_id() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Everything a client knows about the game it joined.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    topic: String,
    role: Role,
    client_id: String,
}

impl Session {
    /// A session under `namespace` with a freshly generated client id.
    pub fn new(id: SessionId, namespace: &str, role: Role) -> Self {
        let topic = resolve_topic(namespace, &id);
        tracing::debug!(session_id = %id, %topic, %role, "session resolved");
        Self {
            id,
            topic,
            role,
            client_id: generate_client_id(),
        }
    }

    /// Uses a fixed client id, so a restarted client can take back the
    /// role it claimed before.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}
