//! GuestRepository trait definition.

use huddle_types::error::RepositoryError;
use huddle_types::ids::{GuestToken, SessionId, UserId};

/// Repository trait for anonymous web guests.
///
/// A web guest is created already inside a session and is destroyed when it
/// leaves; it never counts toward keeping a session alive.
pub trait GuestRepository: Send + Sync {
    /// Create a user inside `session_id` bound to `token`.
    ///
    /// Returns `false` if the token is already registered anywhere or the
    /// session does not exist.
    fn add_web_guest(
        &self,
        session_id: SessionId,
        token: GuestToken,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete the guest binding, its mailbox and the user. No-op for unknown tokens.
    fn remove_web_guest(
        &self,
        token: GuestToken,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn guest_exists(
        &self,
        token: GuestToken,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    fn guest_user_id(
        &self,
        token: GuestToken,
    ) -> impl std::future::Future<Output = Result<Option<UserId>, RepositoryError>> + Send;
}
