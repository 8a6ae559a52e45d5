//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (huddle-infra) implements. The core crate never depends on any specific
//! storage technology.

pub mod guest;
pub mod identity;
pub mod mailbox;
pub mod role;
pub mod session;

use guest::GuestRepository;
use identity::IdentityRepository;
use mailbox::MailboxRepository;
use role::RoleRepository;
use session::SessionRepository;

/// Everything the session coordinator needs from one store.
///
/// Blanket-implemented for any type implementing all the repository traits.
pub trait PartyStore:
    IdentityRepository + SessionRepository + GuestRepository + MailboxRepository + RoleRepository
{
}

impl<T> PartyStore for T where
    T: IdentityRepository
        + SessionRepository
        + GuestRepository
        + MailboxRepository
        + RoleRepository
{
}
