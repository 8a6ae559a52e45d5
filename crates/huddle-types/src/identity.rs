//! Channel identities bound to internal users.
//!
//! A user is backed by exactly one identity: either a durable chat identity
//! or a web guest that lives only as long as its session.

use serde::{Deserialize, Serialize};

use crate::ids::{ChatId, GuestToken, UserId};

/// A user bound to a push-capable chat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatIdentity {
    pub user_id: UserId,
    pub chat_id: ChatId,
    /// Language code used for translation; empty when never set.
    pub language: String,
    /// Id of the last session summary sent to this chat, edited in place on refresh.
    pub pending_message_id: Option<i64>,
}

/// A user bound to an anonymous web join-token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebGuest {
    pub user_id: UserId,
    pub token: GuestToken,
}

/// The identity backing a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    Chat(ChatIdentity),
    WebGuest(WebGuest),
}

impl Identity {
    pub fn user_id(&self) -> UserId {
        match self {
            Identity::Chat(chat) => chat.user_id,
            Identity::WebGuest(guest) => guest.user_id,
        }
    }

    /// Only chat identities keep a session alive.
    pub fn is_chat(&self) -> bool {
        matches!(self, Identity::Chat(_))
    }
}
