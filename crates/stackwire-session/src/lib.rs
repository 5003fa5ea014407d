//! Session identity for Stackwire.
//!
//! This crate answers "which game, and who am I in it":
//!
//! 1. **Identity** — validating the five-digit [`SessionId`] and deriving
//!    the bus topic every client of that game shares ([`resolve_topic`])
//! 2. **Roles** — mapping terminal input to a [`Role`](stackwire_board::Role)
//!    ([`resolve_role`])
//! 3. **Claims** — making sure no two clients play the same side
//!    ([`claim_role`], [`HeldClaim`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Sync engine (above)         ← uses the session topic and the held claim
//!     ↕
//! Session layer (this crate)  ← identity, topic naming, role claims
//!     ↕
//! Protocol + bus (below)      ← RoleClaim encoding, retained pub/sub
//! ```

mod claim;
mod error;
mod session;

pub use claim::{claim_role, ClaimConfig, HeldClaim};
pub use error::SessionError;
pub use session::{
    generate_client_id, resolve_role, resolve_topic, role_claim_topic, Session, SessionId,
    DEFAULT_NAMESPACE, SESSION_ID_LEN,
};
