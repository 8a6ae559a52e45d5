//! SessionRepository trait definition.
//!
//! Session lifecycle: create, join, leave, and disposal once the last chat
//! member is gone.

use huddle_types::error::RepositoryError;
use huddle_types::ids::{InviteToken, SessionId, UserId};
use huddle_types::session::{JoinOutcome, LeftSession, MemberFilter, SessionSwitch};

/// Repository trait for game sessions and their membership.
///
/// A user is a member of at most one session. Every entry point that adds a
/// membership leaves the current session first, inside the same store call.
pub trait SessionRepository: Send + Sync {
    /// Leave the current session (if any), then create a fresh session with a
    /// new invite token and make the user its only member.
    fn create_session(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<SessionSwitch, RepositoryError>> + Send;

    /// Join an existing session. Fails without side effects if it does not exist.
    fn join_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<JoinOutcome, RepositoryError>> + Send;

    /// Join the session behind an invite token. `None` if the token is unknown.
    fn join_by_token(
        &self,
        user_id: UserId,
        token: &InviteToken,
    ) -> impl std::future::Future<Output = Result<Option<SessionId>, RepositoryError>> + Send;

    /// Leave the current session. `None` if the user was not a member.
    ///
    /// When no chat member remains, the session is torn down together with
    /// every remaining web guest and their mailboxes.
    fn leave_session(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<LeftSession>, RepositoryError>> + Send;

    fn session_exists(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    fn current_session(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<SessionId>, RepositoryError>> + Send;

    fn member_count(
        &self,
        session_id: SessionId,
        filter: MemberFilter,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Unordered snapshot of the current members.
    fn members_of(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<Vec<UserId>, RepositoryError>> + Send;

    fn token_of(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<Option<InviteToken>, RepositoryError>> + Send;

    fn session_of(
        &self,
        token: &InviteToken,
    ) -> impl std::future::Future<Output = Result<Option<SessionId>, RepositoryError>> + Send;
}
