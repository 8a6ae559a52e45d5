//! Session lifecycle outcome types.

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

/// Result of creating a session: the new session and the one the user left to get there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSwitch {
    pub session_id: SessionId,
    /// `Some` iff the user was a member of another session beforehand.
    pub previous: Option<SessionId>,
}

/// Result of joining an existing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinOutcome {
    /// The user is now a member; `previous` is the session it left, if any.
    Joined { previous: Option<SessionId> },
    /// The target session does not exist. Nothing was changed.
    SessionNotFound,
}

impl JoinOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, JoinOutcome::Joined { .. })
    }
}

/// Result of a user leaving its current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeftSession {
    pub session_id: SessionId,
    /// True when the departure left no chat members and the session was torn down.
    pub disposed: bool,
}

/// Which members to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberFilter {
    /// Every member, web guests included.
    #[default]
    All,
    /// Only members with a chat identity. This is the count the survivability rule uses.
    ChatOnly,
}

/// Per-user game card: the dealt theme and whether it is currently shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCard {
    pub theme: String,
    pub revealed: bool,
}
