//! RoleRepository trait definition.

use huddle_types::error::RepositoryError;
use huddle_types::ids::UserId;
use huddle_types::session::RoleCard;

/// Repository trait for the per-user role card dealt at the start of a round.
pub trait RoleRepository: Send + Sync {
    /// Deal `theme` to the user, face down.
    fn deal_role(
        &self,
        user_id: UserId,
        theme: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The user's current card, `None` if nothing was dealt.
    fn role_of(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<RoleCard>, RepositoryError>> + Send;

    fn set_role_revealed(
        &self,
        user_id: UserId,
        revealed: bool,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
