//! IdentityRepository trait definition.
//!
//! Maps channel identifiers to stable internal user ids.

use huddle_types::error::RepositoryError;
use huddle_types::identity::Identity;
use huddle_types::ids::{ChatId, UserId};

/// Repository trait for user identities.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait IdentityRepository: Send + Sync {
    /// Get the user bound to `chat_id`, creating the user and its chat identity
    /// with `language_hint` on first contact. Idempotent.
    fn resolve_chat_user(
        &self,
        chat_id: ChatId,
        language_hint: &str,
    ) -> impl std::future::Future<Output = Result<UserId, RepositoryError>> + Send;

    /// Reverse lookup. `None` if the user has no chat identity (e.g. a web guest).
    fn chat_id_of(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<ChatId>, RepositoryError>> + Send;

    /// Resolve the identity backing a user in a single lookup.
    fn identity_of(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<Identity>, RepositoryError>> + Send;

    fn set_language(
        &self,
        user_id: UserId,
        language: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Language code of the user, empty if unset.
    fn language_of(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<String, RepositoryError>> + Send;

    /// Id of the last session summary message sent to the user's chat.
    fn pending_message_of(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<i64>, RepositoryError>> + Send;

    fn set_pending_message(
        &self,
        user_id: UserId,
        message_id: i64,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
