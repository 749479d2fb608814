//! Types, constants and wire protocol shared by the authoritative server and
//! every observing client.
//!
//! Everything here is pure data or a pure function. Anything that mutates
//! authoritative state lives in the `server` crate; the client only ever
//! applies broadcasts built from these types.

pub mod constants;
pub mod protocol;
pub mod targeting;
pub mod types;

pub use constants::*;
pub use protocol::{
    Broadcast, Packet, PlayerSnapshot, Rejection, Request, TargetKind, TargetSnapshot,
};
pub use targeting::{can_be_sabotaged, select_target, Candidate};
pub use types::{MatchPhase, PlayerId, Position, Role, TargetId, Team};
