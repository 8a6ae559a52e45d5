//! Session coordination shared by the chat command layer and the web channel.
//!
//! Wraps the store's lifecycle operations so that every membership change is
//! followed by a refresh of the affected sessions' summaries: chat members get
//! their summary message edited in place, web guests get it in their mailbox.
//! A chat user who creates or joins a session gets a fresh summary message
//! instead, since the one it last saw belongs to the session it left.
//!
//! Also deals the per-round cards: a free theme with one spy, a Spyfall
//! location with per-player roles, or a set of distinct numbers.

use huddle_types::config::SpyfallLocation;
use huddle_types::error::LobbyError;
use huddle_types::identity::Identity;
use huddle_types::ids::{GuestToken, InviteToken, SessionId, UserId};
use huddle_types::session::{JoinOutcome, LeftSession, MemberFilter, SessionSwitch};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::repository::PartyStore;
use crate::service::notify::ChatNotifier;
use crate::service::translate::Translator;

/// Translation key of the session summary shown to every member.
pub const KEY_SESSION_SUMMARY: &str = "session_summary";
/// Translation key of the card text dealt to the spy.
pub const KEY_THEME_SPY: &str = "theme_spy";
/// Translation key wrapping a dealt card.
pub const KEY_THEME_DEALT: &str = "theme_dealt";
/// Translation key of a Spyfall card with a role.
pub const KEY_SPYFALL_ROLE: &str = "spyfall_role";
/// Translation key of a dealt number.
pub const KEY_NUMBER_DEALT: &str = "number_dealt";

/// Service orchestrating session membership changes and their notifications.
///
/// Generic over the store and the two collaborator capabilities so that
/// huddle-core never depends on huddle-infra or a chat client.
pub struct LobbyService<S: PartyStore, N: ChatNotifier, T: Translator> {
    store: S,
    notifier: N,
    translator: T,
    mailbox_retention: u32,
    spyfall_locations: Vec<SpyfallLocation>,
}

impl<S: PartyStore, N: ChatNotifier, T: Translator> LobbyService<S, N, T> {
    /// Create a new LobbyService.
    ///
    /// - `mailbox_retention`: how many messages each web guest's mailbox keeps
    pub fn new(store: S, notifier: N, translator: T, mailbox_retention: u32) -> Self {
        Self {
            store,
            notifier,
            translator,
            mailbox_retention,
            spyfall_locations: Vec::new(),
        }
    }

    /// Set the deck [`deal_spyfall_location`](Self::deal_spyfall_location) draws from.
    pub fn with_spyfall_locations(mut self, locations: Vec<SpyfallLocation>) -> Self {
        self.spyfall_locations = locations;
        self
    }

    pub fn spyfall_locations(&self) -> &[SpyfallLocation] {
        &self.spyfall_locations
    }

    /// Direct access to the underlying store for read-only queries.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn mailbox_retention(&self) -> u32 {
        self.mailbox_retention
    }

    /// Translate `key` into the user's language.
    pub async fn translate_for(
        &self,
        user_id: UserId,
        key: &str,
        params: &[(&str, &str)],
    ) -> Result<String, LobbyError> {
        let language = self.store.language_of(user_id).await?;
        Ok(self.translator.translate(&language, key, params))
    }

    /// Start a new session for `user_id`, leaving its current one.
    pub async fn create_session(&self, user_id: UserId) -> Result<SessionSwitch, LobbyError> {
        let switch = self.store.create_session(user_id).await?;
        tracing::info!(user = %user_id, session = %switch.session_id, "session created");

        self.refresh_members(switch.session_id, Some(user_id)).await?;
        if let Some(previous) = switch.previous {
            self.refresh_if_alive(previous).await?;
        }
        Ok(switch)
    }

    /// Join the session behind an invite token.
    ///
    /// Returns `false` when the invite is unknown or its session is gone.
    pub async fn join_by_token(
        &self,
        user_id: UserId,
        token: &InviteToken,
    ) -> Result<bool, LobbyError> {
        let Some(session_id) = self.store.session_of(token).await? else {
            tracing::debug!(user = %user_id, "invite token not found");
            return Ok(false);
        };

        match self.store.join_session(user_id, session_id).await? {
            JoinOutcome::SessionNotFound => Ok(false),
            JoinOutcome::Joined { previous } => {
                tracing::debug!(user = %user_id, session = %session_id, "joined session");
                self.refresh_members(session_id, Some(user_id)).await?;
                if let Some(previous) = previous.filter(|p| *p != session_id) {
                    self.refresh_if_alive(previous).await?;
                }
                Ok(true)
            }
        }
    }

    /// Leave the current session and refresh whoever remains in it.
    pub async fn leave_session(&self, user_id: UserId) -> Result<Option<LeftSession>, LobbyError> {
        let left = self.store.leave_session(user_id).await?;
        if let Some(left) = left {
            if left.disposed {
                tracing::info!(session = %left.session_id, "session disposed");
            } else {
                self.refresh_session(left.session_id).await?;
            }
        }
        Ok(left)
    }

    /// Add a web guest to a session and refresh the session for everyone.
    pub async fn add_web_guest(
        &self,
        session_id: SessionId,
        token: GuestToken,
    ) -> Result<bool, LobbyError> {
        let added = self.store.add_web_guest(session_id, token).await?;
        if added {
            self.refresh_session(session_id).await?;
        }
        Ok(added)
    }

    /// Remove a web guest. Returns the session it was in, if any.
    pub async fn remove_web_guest(
        &self,
        token: GuestToken,
    ) -> Result<Option<SessionId>, LobbyError> {
        let Some(user_id) = self.store.guest_user_id(token).await? else {
            return Ok(None);
        };
        let session_id = self.store.current_session(user_id).await?;
        self.store.remove_web_guest(token).await?;

        if let Some(session_id) = session_id {
            self.refresh_if_alive(session_id).await?;
        }
        Ok(session_id)
    }

    /// Send a fresh session summary to a single chat member and remember its id.
    ///
    /// Unlike [`refresh_session`](Self::refresh_session), this always posts a
    /// new message and propagates notification failures.
    pub async fn send_session_summary(&self, user_id: UserId) -> Result<(), LobbyError> {
        let Some(session_id) = self.store.current_session(user_id).await? else {
            return Ok(());
        };
        let Some(chat_id) = self.store.chat_id_of(user_id).await? else {
            return Ok(());
        };
        let text = self.summary_text(user_id, session_id).await?;
        let message_id = self.notifier.notify(chat_id, &text, None).await?;
        self.store.set_pending_message(user_id, message_id).await?;
        Ok(())
    }

    /// Re-render the summary for every member of a session.
    ///
    /// A chat that cannot be reached is logged and skipped so one stale
    /// channel does not block the others.
    pub async fn refresh_session(&self, session_id: SessionId) -> Result<(), LobbyError> {
        self.refresh_members(session_id, None).await
    }

    /// Like [`refresh_session`](Self::refresh_session), but `newcomer` gets a
    /// new summary message rather than an edit of its stored one.
    async fn refresh_members(
        &self,
        session_id: SessionId,
        newcomer: Option<UserId>,
    ) -> Result<(), LobbyError> {
        let members = self.store.members_of(session_id).await?;
        for user_id in members {
            let Some(identity) = self.store.identity_of(user_id).await? else {
                continue;
            };
            let text = self.summary_text(user_id, session_id).await?;
            match identity {
                Identity::Chat(chat) => {
                    let edit = chat
                        .pending_message_id
                        .filter(|_| Some(user_id) != newcomer);
                    match self.notifier.notify(chat.chat_id, &text, edit).await {
                        Ok(message_id) => {
                            self.store.set_pending_message(user_id, message_id).await?;
                        }
                        Err(e) => {
                            tracing::warn!(user = %user_id, chat = %chat.chat_id, "summary refresh failed: {e}");
                        }
                    }
                }
                Identity::WebGuest(_) => {
                    self.store
                        .push(user_id, &text, self.mailbox_retention)
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Deal `theme` to every member of a session except `exclude`, with one
    /// member picked at random to receive the spy card instead.
    ///
    /// Returns the spy, or `None` when there was nobody to deal to.
    pub async fn deal_roles(
        &self,
        session_id: SessionId,
        theme: &str,
        exclude: Option<UserId>,
    ) -> Result<Option<UserId>, LobbyError> {
        let players: Vec<UserId> = self
            .store
            .members_of(session_id)
            .await?
            .into_iter()
            .filter(|user_id| Some(*user_id) != exclude)
            .collect();
        if players.is_empty() {
            return Ok(None);
        }

        let spy_index = rand::thread_rng().gen_range(0..players.len());
        let spy = players[spy_index];

        for &user_id in &players {
            let card = if user_id == spy {
                self.translate_for(user_id, KEY_THEME_SPY, &[]).await?
            } else {
                theme.to_string()
            };
            self.store.deal_role(user_id, &card).await?;
            self.deliver_card(user_id, &card).await?;
        }

        tracing::info!(session = %session_id, players = players.len(), "roles dealt");
        Ok(Some(spy))
    }

    /// Draw a random Spyfall location and deal it to every member of a
    /// session. One member is the spy; the others each get the location with
    /// one of its roles, shuffled, cycling when there are more players than
    /// roles.
    ///
    /// Returns the spy, or `None` when the session has no members. Fails with
    /// [`LobbyError::NoLocations`] when the deck is empty.
    pub async fn deal_spyfall_location(
        &self,
        session_id: SessionId,
    ) -> Result<Option<UserId>, LobbyError> {
        if self.spyfall_locations.is_empty() {
            return Err(LobbyError::NoLocations);
        }
        let players = self.store.members_of(session_id).await?;
        if players.is_empty() {
            return Ok(None);
        }

        // ThreadRng is not Send; keep it out of the awaits below.
        let (location, spy, roles) = {
            let mut rng = rand::thread_rng();
            let Some(location) = self.spyfall_locations.choose(&mut rng) else {
                return Err(LobbyError::NoLocations);
            };
            let mut roles = location.roles.clone();
            roles.shuffle(&mut rng);
            let spy = players[rng.gen_range(0..players.len())];
            (location, spy, roles)
        };

        let mut roles = roles.iter().cycle();
        for &user_id in &players {
            if user_id == spy {
                let card = self.translate_for(user_id, KEY_THEME_SPY, &[]).await?;
                self.store.deal_role(user_id, &card).await?;
                self.deliver_card(user_id, &card).await?;
                continue;
            }

            self.store.deal_role(user_id, &location.id).await?;
            match roles.next() {
                Some(role) => {
                    let text = self
                        .translate_for(
                            user_id,
                            KEY_SPYFALL_ROLE,
                            &[("location", location.id.as_str()), ("role", role.as_str())],
                        )
                        .await?;
                    self.deliver(user_id, &text).await?;
                }
                None => self.deliver_card(user_id, &location.id).await?,
            }
        }

        tracing::info!(
            session = %session_id,
            location = %location.id,
            players = players.len(),
            "spyfall location dealt"
        );
        Ok(Some(spy))
    }

    /// Hand every member of a session a distinct number from 1 up to the
    /// member count, in random order. Returns how many numbers were dealt.
    pub async fn deal_numbers(&self, session_id: SessionId) -> Result<usize, LobbyError> {
        let players = self.store.members_of(session_id).await?;
        let mut numbers: Vec<usize> = (1..=players.len()).collect();
        numbers.shuffle(&mut rand::thread_rng());

        for (&user_id, number) in players.iter().zip(numbers) {
            let number = number.to_string();
            let text = self
                .translate_for(user_id, KEY_NUMBER_DEALT, &[("number", number.as_str())])
                .await?;
            self.deliver(user_id, &text).await?;
        }

        tracing::info!(session = %session_id, players = players.len(), "numbers dealt");
        Ok(players.len())
    }

    async fn deliver_card(&self, user_id: UserId, card: &str) -> Result<(), LobbyError> {
        let text = self
            .translate_for(user_id, KEY_THEME_DEALT, &[("theme", card)])
            .await?;
        self.deliver(user_id, &text).await
    }

    /// Post to a chat member or queue for a web guest. Chat failures are
    /// logged and skipped.
    async fn deliver(&self, user_id: UserId, text: &str) -> Result<(), LobbyError> {
        match self.store.identity_of(user_id).await? {
            Some(Identity::Chat(chat)) => {
                if let Err(e) = self.notifier.notify(chat.chat_id, text, None).await {
                    tracing::warn!(user = %user_id, chat = %chat.chat_id, "delivery failed: {e}");
                }
            }
            Some(Identity::WebGuest(_)) => {
                self.store
                    .push(user_id, text, self.mailbox_retention)
                    .await?;
            }
            None => {}
        }
        Ok(())
    }

    async fn refresh_if_alive(&self, session_id: SessionId) -> Result<(), LobbyError> {
        if self.store.session_exists(session_id).await? {
            self.refresh_session(session_id).await?;
        }
        Ok(())
    }

    async fn summary_text(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<String, LobbyError> {
        let players = self
            .store
            .member_count(session_id, MemberFilter::All)
            .await?
            .to_string();
        let invite = self
            .store
            .token_of(session_id)
            .await?
            .map(|t| t.0)
            .unwrap_or_default();
        self.translate_for(
            user_id,
            KEY_SESSION_SUMMARY,
            &[("players", players.as_str()), ("invite", invite.as_str())],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use huddle_types::error::{NotifyError, RepositoryError};
    use huddle_types::identity::{ChatIdentity, WebGuest};
    use huddle_types::ids::ChatId;
    use huddle_types::mailbox::MailboxBatch;
    use huddle_types::session::RoleCard;

    use super::*;
    use crate::repository::guest::GuestRepository;
    use crate::repository::identity::IdentityRepository;
    use crate::repository::mailbox::MailboxRepository;
    use crate::repository::role::RoleRepository;
    use crate::repository::session::SessionRepository;

    // --- Fake store ---

    #[derive(Default)]
    struct FakeUser {
        session: Option<i64>,
        chat_id: Option<i64>,
        guest_token: Option<i64>,
        language: String,
        pending: Option<i64>,
        role: Option<RoleCard>,
        mailbox: Vec<(i64, String)>,
    }

    #[derive(Default)]
    struct FakeState {
        next_id: i64,
        users: HashMap<i64, FakeUser>,
        sessions: HashMap<i64, String>,
    }

    impl FakeState {
        fn next(&mut self) -> i64 {
            self.next_id += 1;
            self.next_id
        }

        fn leave(&mut self, user_id: i64) -> Option<LeftSession> {
            let user = self.users.get_mut(&user_id)?;
            let session = user.session.take()?;
            let chat_left = self
                .users
                .values()
                .any(|u| u.session == Some(session) && u.chat_id.is_some());
            if chat_left {
                return Some(LeftSession {
                    session_id: SessionId(session),
                    disposed: false,
                });
            }
            self.sessions.remove(&session);
            self.users.retain(|_, u| u.session != Some(session));
            Some(LeftSession {
                session_id: SessionId(session),
                disposed: true,
            })
        }
    }

    #[derive(Default)]
    struct FakeStore {
        state: Mutex<FakeState>,
    }

    impl IdentityRepository for FakeStore {
        async fn resolve_chat_user(
            &self,
            chat_id: ChatId,
            language_hint: &str,
        ) -> Result<UserId, RepositoryError> {
            let mut state = self.state.lock().unwrap();
            if let Some((id, _)) = state
                .users
                .iter()
                .find(|(_, u)| u.chat_id == Some(chat_id.0))
            {
                return Ok(UserId(*id));
            }
            let id = state.next();
            state.users.insert(
                id,
                FakeUser {
                    chat_id: Some(chat_id.0),
                    language: language_hint.to_string(),
                    ..Default::default()
                },
            );
            Ok(UserId(id))
        }

        async fn chat_id_of(&self, user_id: UserId) -> Result<Option<ChatId>, RepositoryError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .users
                .get(&user_id.0)
                .and_then(|u| u.chat_id)
                .map(ChatId))
        }

        async fn identity_of(&self, user_id: UserId) -> Result<Option<Identity>, RepositoryError> {
            let state = self.state.lock().unwrap();
            Ok(state.users.get(&user_id.0).map(|u| match (u.chat_id, u.guest_token) {
                (Some(chat_id), _) => Identity::Chat(ChatIdentity {
                    user_id,
                    chat_id: ChatId(chat_id),
                    language: u.language.clone(),
                    pending_message_id: u.pending,
                }),
                (None, token) => Identity::WebGuest(WebGuest {
                    user_id,
                    token: GuestToken(token.unwrap_or_default()),
                }),
            }))
        }

        async fn set_language(&self, user_id: UserId, language: &str) -> Result<(), RepositoryError> {
            let mut state = self.state.lock().unwrap();
            if let Some(user) = state.users.get_mut(&user_id.0) {
                user.language = language.to_string();
            }
            Ok(())
        }

        async fn language_of(&self, user_id: UserId) -> Result<String, RepositoryError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .users
                .get(&user_id.0)
                .map(|u| u.language.clone())
                .unwrap_or_default())
        }

        async fn pending_message_of(&self, user_id: UserId) -> Result<Option<i64>, RepositoryError> {
            let state = self.state.lock().unwrap();
            Ok(state.users.get(&user_id.0).and_then(|u| u.pending))
        }

        async fn set_pending_message(
            &self,
            user_id: UserId,
            message_id: i64,
        ) -> Result<(), RepositoryError> {
            let mut state = self.state.lock().unwrap();
            if let Some(user) = state.users.get_mut(&user_id.0) {
                user.pending = Some(message_id);
            }
            Ok(())
        }
    }

    impl SessionRepository for FakeStore {
        async fn create_session(&self, user_id: UserId) -> Result<SessionSwitch, RepositoryError> {
            let mut state = self.state.lock().unwrap();
            let previous = state.leave(user_id.0).map(|l| l.session_id);
            let id = state.next();
            state.sessions.insert(id, format!("invite-{id}"));
            if let Some(user) = state.users.get_mut(&user_id.0) {
                user.session = Some(id);
            }
            Ok(SessionSwitch {
                session_id: SessionId(id),
                previous,
            })
        }

        async fn join_session(
            &self,
            user_id: UserId,
            session_id: SessionId,
        ) -> Result<JoinOutcome, RepositoryError> {
            let mut state = self.state.lock().unwrap();
            if !state.sessions.contains_key(&session_id.0) {
                return Ok(JoinOutcome::SessionNotFound);
            }
            let current = match state.users.get(&user_id.0) {
                Some(user) if user.chat_id.is_some() => user.session,
                _ => {
                    return Err(RepositoryError::NotFound(format!(
                        "user {user_id} has no chat identity"
                    )));
                }
            };
            if current == Some(session_id.0) {
                return Ok(JoinOutcome::Joined {
                    previous: Some(session_id),
                });
            }
            let previous = state.leave(user_id.0).map(|l| l.session_id);
            if !state.sessions.contains_key(&session_id.0) {
                return Ok(JoinOutcome::SessionNotFound);
            }
            if let Some(user) = state.users.get_mut(&user_id.0) {
                user.session = Some(session_id.0);
            }
            Ok(JoinOutcome::Joined { previous })
        }

        async fn join_by_token(
            &self,
            user_id: UserId,
            token: &InviteToken,
        ) -> Result<Option<SessionId>, RepositoryError> {
            let Some(session_id) = self.session_of(token).await? else {
                return Ok(None);
            };
            Ok(self
                .join_session(user_id, session_id)
                .await?
                .succeeded()
                .then_some(session_id))
        }

        async fn leave_session(&self, user_id: UserId) -> Result<Option<LeftSession>, RepositoryError> {
            Ok(self.state.lock().unwrap().leave(user_id.0))
        }

        async fn session_exists(&self, session_id: SessionId) -> Result<bool, RepositoryError> {
            Ok(self.state.lock().unwrap().sessions.contains_key(&session_id.0))
        }

        async fn current_session(&self, user_id: UserId) -> Result<Option<SessionId>, RepositoryError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .users
                .get(&user_id.0)
                .and_then(|u| u.session)
                .map(SessionId))
        }

        async fn member_count(
            &self,
            session_id: SessionId,
            filter: MemberFilter,
        ) -> Result<u64, RepositoryError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .users
                .values()
                .filter(|u| u.session == Some(session_id.0))
                .filter(|u| filter == MemberFilter::All || u.chat_id.is_some())
                .count() as u64)
        }

        async fn members_of(&self, session_id: SessionId) -> Result<Vec<UserId>, RepositoryError> {
            let state = self.state.lock().unwrap();
            let mut members: Vec<UserId> = state
                .users
                .iter()
                .filter(|(_, u)| u.session == Some(session_id.0))
                .map(|(id, _)| UserId(*id))
                .collect();
            members.sort();
            Ok(members)
        }

        async fn token_of(&self, session_id: SessionId) -> Result<Option<InviteToken>, RepositoryError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .sessions
                .get(&session_id.0)
                .map(|t| InviteToken(t.clone())))
        }

        async fn session_of(&self, token: &InviteToken) -> Result<Option<SessionId>, RepositoryError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .sessions
                .iter()
                .find(|(_, t)| t.as_str() == token.as_str())
                .map(|(id, _)| SessionId(*id)))
        }
    }

    impl GuestRepository for FakeStore {
        async fn add_web_guest(
            &self,
            session_id: SessionId,
            token: GuestToken,
        ) -> Result<bool, RepositoryError> {
            let mut state = self.state.lock().unwrap();
            let clash = state.users.values().any(|u| u.guest_token == Some(token.0));
            if clash || !state.sessions.contains_key(&session_id.0) {
                return Ok(false);
            }
            let id = state.next();
            state.users.insert(
                id,
                FakeUser {
                    session: Some(session_id.0),
                    guest_token: Some(token.0),
                    ..Default::default()
                },
            );
            Ok(true)
        }

        async fn remove_web_guest(&self, token: GuestToken) -> Result<(), RepositoryError> {
            let mut state = self.state.lock().unwrap();
            state.users.retain(|_, u| u.guest_token != Some(token.0));
            Ok(())
        }

        async fn guest_exists(&self, token: GuestToken) -> Result<bool, RepositoryError> {
            Ok(self.guest_user_id(token).await?.is_some())
        }

        async fn guest_user_id(&self, token: GuestToken) -> Result<Option<UserId>, RepositoryError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .users
                .iter()
                .find(|(_, u)| u.guest_token == Some(token.0))
                .map(|(id, _)| UserId(*id)))
        }
    }

    impl MailboxRepository for FakeStore {
        async fn push(
            &self,
            user_id: UserId,
            text: &str,
            max_retained: u32,
        ) -> Result<(), RepositoryError> {
            let mut state = self.state.lock().unwrap();
            if let Some(user) = state.users.get_mut(&user_id.0) {
                let next = user.mailbox.last().map(|(i, _)| i + 1).unwrap_or(0);
                user.mailbox.push((next, text.to_string()));
                let floor = next - i64::from(max_retained);
                user.mailbox.retain(|(i, _)| *i > floor);
            }
            Ok(())
        }

        async fn drain_since(
            &self,
            user_id: UserId,
            last_seen: i64,
        ) -> Result<MailboxBatch, RepositoryError> {
            let state = self.state.lock().unwrap();
            let mut batch = MailboxBatch {
                messages: Vec::new(),
                last_seen,
            };
            if let Some(user) = state.users.get(&user_id.0) {
                for (index, text) in user.mailbox.iter().filter(|(i, _)| *i > last_seen) {
                    batch.messages.push(text.clone());
                    batch.last_seen = *index;
                }
            }
            Ok(batch)
        }
    }

    impl RoleRepository for FakeStore {
        async fn deal_role(&self, user_id: UserId, theme: &str) -> Result<(), RepositoryError> {
            let mut state = self.state.lock().unwrap();
            if let Some(user) = state.users.get_mut(&user_id.0) {
                user.role = Some(RoleCard {
                    theme: theme.to_string(),
                    revealed: false,
                });
            }
            Ok(())
        }

        async fn role_of(&self, user_id: UserId) -> Result<Option<RoleCard>, RepositoryError> {
            let state = self.state.lock().unwrap();
            Ok(state.users.get(&user_id.0).and_then(|u| u.role.clone()))
        }

        async fn set_role_revealed(&self, user_id: UserId, revealed: bool) -> Result<(), RepositoryError> {
            let mut state = self.state.lock().unwrap();
            if let Some(role) = state.users.get_mut(&user_id.0).and_then(|u| u.role.as_mut()) {
                role.revealed = revealed;
            }
            Ok(())
        }
    }

    // --- Fake collaborators ---

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(ChatId, String, Option<i64>)>>,
        unreachable: HashSet<i64>,
    }

    impl RecordingNotifier {
        fn sent(&self) -> Vec<(ChatId, String, Option<i64>)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl ChatNotifier for RecordingNotifier {
        async fn notify(
            &self,
            chat_id: ChatId,
            content: &str,
            edit_message_id: Option<i64>,
        ) -> Result<i64, NotifyError> {
            if self.unreachable.contains(&chat_id.0) {
                return Err(NotifyError::Unreachable(chat_id.0));
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push((chat_id, content.to_string(), edit_message_id));
            Ok(edit_message_id.unwrap_or(100 + sent.len() as i64))
        }
    }

    struct KeyTranslator;

    impl Translator for KeyTranslator {
        fn translate(&self, _language: &str, key: &str, params: &[(&str, &str)]) -> String {
            let mut out = format!("[{key}]");
            for (name, value) in params {
                out.push_str(&format!(" {name}={value}"));
            }
            out
        }
    }

    fn lobby(notifier: RecordingNotifier) -> LobbyService<FakeStore, RecordingNotifier, KeyTranslator> {
        LobbyService::new(FakeStore::default(), notifier, KeyTranslator, 10)
    }

    /// Alice hosts, Bob joins by invite and a web guest is added.
    async fn full_table(
        lobby: &LobbyService<FakeStore, RecordingNotifier, KeyTranslator>,
    ) -> (SessionId, [UserId; 3]) {
        let alice = lobby.store().resolve_chat_user(ChatId(1), "en").await.unwrap();
        let bob = lobby.store().resolve_chat_user(ChatId(2), "en").await.unwrap();
        let switch = lobby.create_session(alice).await.unwrap();
        let token = lobby.store().token_of(switch.session_id).await.unwrap().unwrap();
        lobby.join_by_token(bob, &token).await.unwrap();
        lobby.add_web_guest(switch.session_id, GuestToken(3)).await.unwrap();
        let guest = lobby.store().guest_user_id(GuestToken(3)).await.unwrap().unwrap();
        (switch.session_id, [alice, bob, guest])
    }

    /// Every text delivered so far, chat and mailbox alike.
    async fn delivered(
        lobby: &LobbyService<FakeStore, RecordingNotifier, KeyTranslator>,
        guest: UserId,
    ) -> Vec<String> {
        let mut texts: Vec<String> = lobby.notifier.sent().into_iter().map(|(_, t, _)| t).collect();
        texts.extend(lobby.store().drain_since(guest, -1).await.unwrap().messages);
        texts
    }

    #[tokio::test]
    async fn test_create_session_sends_summary_to_creator() {
        let lobby = lobby(RecordingNotifier::default());
        let alice = lobby.store().resolve_chat_user(ChatId(1), "en").await.unwrap();

        let switch = lobby.create_session(alice).await.unwrap();
        assert!(switch.previous.is_none());

        let sent = lobby.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChatId(1));
        assert!(sent[0].1.contains("players=1"));
        assert!(sent[0].1.contains(&format!("invite=invite-{}", switch.session_id)));
        assert_eq!(lobby.store().pending_message_of(alice).await.unwrap(), Some(101));
    }

    #[tokio::test]
    async fn test_join_by_token_refreshes_in_place() {
        let lobby = lobby(RecordingNotifier::default());
        let alice = lobby.store().resolve_chat_user(ChatId(1), "en").await.unwrap();
        let bob = lobby.store().resolve_chat_user(ChatId(2), "en").await.unwrap();

        let switch = lobby.create_session(alice).await.unwrap();
        let token = lobby.store().token_of(switch.session_id).await.unwrap().unwrap();

        assert!(lobby.join_by_token(bob, &token).await.unwrap());

        let sent = lobby.notifier.sent();
        // Alice's summary is edited in place, Bob gets a fresh one.
        let alice_edit = sent
            .iter()
            .find(|(chat, text, edit)| *chat == ChatId(1) && edit.is_some() && text.contains("players=2"));
        assert!(alice_edit.is_some());
        assert!(sent.iter().any(|(chat, _, edit)| *chat == ChatId(2) && edit.is_none()));
    }

    #[tokio::test]
    async fn test_switching_sessions_posts_fresh_summary() {
        let lobby = lobby(RecordingNotifier::default());
        let alice = lobby.store().resolve_chat_user(ChatId(1), "en").await.unwrap();
        let bob = lobby.store().resolve_chat_user(ChatId(2), "en").await.unwrap();

        lobby.create_session(bob).await.unwrap();
        assert_eq!(lobby.store().pending_message_of(bob).await.unwrap(), Some(101));
        let switch = lobby.create_session(alice).await.unwrap();
        let token = lobby.store().token_of(switch.session_id).await.unwrap().unwrap();
        let before = lobby.notifier.sent().len();

        assert!(lobby.join_by_token(bob, &token).await.unwrap());

        let to_bob: Vec<_> = lobby.notifier.sent()[before..]
            .iter()
            .filter(|(chat, _, _)| *chat == ChatId(2))
            .cloned()
            .collect();
        assert_eq!(to_bob.len(), 1);
        assert!(to_bob[0].1.contains(&format!("invite={token}")));
        assert_eq!(to_bob[0].2, None);

        let pending = lobby.store().pending_message_of(bob).await.unwrap();
        assert!(pending.is_some());
        assert_ne!(pending, Some(101));
    }

    #[tokio::test]
    async fn test_create_after_create_posts_fresh_summary() {
        let lobby = lobby(RecordingNotifier::default());
        let alice = lobby.store().resolve_chat_user(ChatId(1), "en").await.unwrap();

        lobby.create_session(alice).await.unwrap();
        let second = lobby.create_session(alice).await.unwrap();

        let sent = lobby.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].2, None);
        assert!(sent[1].1.contains(&format!("invite=invite-{}", second.session_id)));
        assert_eq!(lobby.store().pending_message_of(alice).await.unwrap(), Some(102));
    }

    #[tokio::test]
    async fn test_rejoin_current_session_keeps_membership() {
        let lobby = lobby(RecordingNotifier::default());
        let alice = lobby.store().resolve_chat_user(ChatId(1), "en").await.unwrap();
        let switch = lobby.create_session(alice).await.unwrap();
        let token = lobby.store().token_of(switch.session_id).await.unwrap().unwrap();

        assert!(lobby.join_by_token(alice, &token).await.unwrap());

        assert!(lobby.store().session_exists(switch.session_id).await.unwrap());
        assert_eq!(
            lobby.store().current_session(alice).await.unwrap(),
            Some(switch.session_id)
        );
        assert_eq!(
            lobby
                .store()
                .member_count(switch.session_id, MemberFilter::All)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_join_by_unknown_token_fails() {
        let lobby = lobby(RecordingNotifier::default());
        let bob = lobby.store().resolve_chat_user(ChatId(2), "en").await.unwrap();

        let joined = lobby.join_by_token(bob, &InviteToken::from("nope")).await.unwrap();
        assert!(!joined);
        assert!(lobby.notifier.sent().is_empty());
        assert!(lobby.store().current_session(bob).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_web_guest_receives_summary_in_mailbox() {
        let lobby = lobby(RecordingNotifier::default());
        let alice = lobby.store().resolve_chat_user(ChatId(1), "en").await.unwrap();
        let switch = lobby.create_session(alice).await.unwrap();

        assert!(lobby.add_web_guest(switch.session_id, GuestToken(42)).await.unwrap());
        assert!(!lobby.add_web_guest(switch.session_id, GuestToken(42)).await.unwrap());

        let guest = lobby.store().guest_user_id(GuestToken(42)).await.unwrap().unwrap();
        let batch = lobby.store().drain_since(guest, -1).await.unwrap();
        assert_eq!(batch.messages.len(), 1);
        assert!(batch.messages[0].contains("players=2"));
    }

    #[tokio::test]
    async fn test_remove_web_guest_refreshes_session() {
        let lobby = lobby(RecordingNotifier::default());
        let alice = lobby.store().resolve_chat_user(ChatId(1), "en").await.unwrap();
        let switch = lobby.create_session(alice).await.unwrap();
        lobby.add_web_guest(switch.session_id, GuestToken(7)).await.unwrap();

        let from = lobby.remove_web_guest(GuestToken(7)).await.unwrap();
        assert_eq!(from, Some(switch.session_id));

        let last = lobby.notifier.sent().pop().unwrap();
        assert!(last.1.contains("players=1"));
        assert_eq!(lobby.remove_web_guest(GuestToken(7)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_leave_last_chat_member_disposes() {
        let lobby = lobby(RecordingNotifier::default());
        let alice = lobby.store().resolve_chat_user(ChatId(1), "en").await.unwrap();
        let switch = lobby.create_session(alice).await.unwrap();
        lobby.add_web_guest(switch.session_id, GuestToken(9)).await.unwrap();

        let left = lobby.leave_session(alice).await.unwrap().unwrap();
        assert!(left.disposed);
        assert!(!lobby.store().session_exists(switch.session_id).await.unwrap());
        assert!(!lobby.store().guest_exists(GuestToken(9)).await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_chat_does_not_block_refresh() {
        let notifier = RecordingNotifier {
            unreachable: HashSet::from([1]),
            ..Default::default()
        };
        let lobby = lobby(notifier);
        let alice = lobby.store().resolve_chat_user(ChatId(1), "en").await.unwrap();
        let bob = lobby.store().resolve_chat_user(ChatId(2), "en").await.unwrap();

        let switch = lobby.create_session(alice).await.unwrap();
        let token = lobby.store().token_of(switch.session_id).await.unwrap().unwrap();
        assert!(lobby.join_by_token(bob, &token).await.unwrap());

        assert!(lobby.notifier.sent().iter().any(|(chat, _, _)| *chat == ChatId(2)));
        assert!(lobby.store().pending_message_of(alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_session_summary_propagates_failure() {
        let notifier = RecordingNotifier {
            unreachable: HashSet::from([5]),
            ..Default::default()
        };
        let lobby = lobby(notifier);
        let carol = lobby.store().resolve_chat_user(ChatId(5), "en").await.unwrap();
        lobby.store().create_session(carol).await.unwrap();

        let err = lobby.send_session_summary(carol).await.unwrap_err();
        assert!(matches!(err, LobbyError::Notify(NotifyError::Unreachable(5))));
    }

    #[tokio::test]
    async fn test_deal_roles_picks_exactly_one_spy() {
        let lobby = lobby(RecordingNotifier::default());
        let alice = lobby.store().resolve_chat_user(ChatId(1), "en").await.unwrap();
        let bob = lobby.store().resolve_chat_user(ChatId(2), "en").await.unwrap();
        let switch = lobby.create_session(alice).await.unwrap();
        let token = lobby.store().token_of(switch.session_id).await.unwrap().unwrap();
        lobby.join_by_token(bob, &token).await.unwrap();
        lobby.add_web_guest(switch.session_id, GuestToken(3)).await.unwrap();
        let guest = lobby.store().guest_user_id(GuestToken(3)).await.unwrap().unwrap();

        let spy = lobby
            .deal_roles(switch.session_id, "Submarine", None)
            .await
            .unwrap()
            .unwrap();

        let mut spies = 0;
        for user in [alice, bob, guest] {
            let card = lobby.store().role_of(user).await.unwrap().unwrap();
            assert!(!card.revealed);
            if card.theme == "[theme_spy]" {
                spies += 1;
                assert_eq!(user, spy);
            } else {
                assert_eq!(card.theme, "Submarine");
            }
        }
        assert_eq!(spies, 1);

        let guest_mail = lobby.store().drain_since(guest, -1).await.unwrap();
        assert!(guest_mail.messages.iter().any(|m| m.starts_with("[theme_dealt]")));
    }

    #[tokio::test]
    async fn test_deal_roles_excludes_dealer() {
        let lobby = lobby(RecordingNotifier::default());
        let alice = lobby.store().resolve_chat_user(ChatId(1), "en").await.unwrap();
        let switch = lobby.create_session(alice).await.unwrap();

        let spy = lobby
            .deal_roles(switch.session_id, "Casino", Some(alice))
            .await
            .unwrap();
        assert!(spy.is_none());
        assert!(lobby.store().role_of(alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deal_spyfall_location_assigns_roles() {
        let lobby = lobby(RecordingNotifier::default()).with_spyfall_locations(vec![
            SpyfallLocation {
                id: "Submarine".to_string(),
                roles: vec!["Captain".to_string(), "Cook".to_string()],
            },
        ]);
        let (session, players) = full_table(&lobby).await;

        let spy = lobby.deal_spyfall_location(session).await.unwrap().unwrap();

        for user in players {
            let card = lobby.store().role_of(user).await.unwrap().unwrap();
            if user == spy {
                assert_eq!(card.theme, "[theme_spy]");
            } else {
                assert_eq!(card.theme, "Submarine");
            }
        }

        let texts = delivered(&lobby, players[2]).await;
        let mut roles: Vec<&str> = texts
            .iter()
            .filter(|t| t.starts_with("[spyfall_role] location=Submarine"))
            .filter_map(|t| t.split("role=").nth(1))
            .collect();
        roles.sort_unstable();
        assert_eq!(roles, vec!["Captain", "Cook"]);
        assert_eq!(
            texts.iter().filter(|t| t.as_str() == "[theme_dealt] theme=[theme_spy]").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_deal_spyfall_location_without_roles_sends_location() {
        let lobby = lobby(RecordingNotifier::default()).with_spyfall_locations(vec![
            SpyfallLocation {
                id: "Beach".to_string(),
                roles: Vec::new(),
            },
        ]);
        let (session, players) = full_table(&lobby).await;

        lobby.deal_spyfall_location(session).await.unwrap();

        let texts = delivered(&lobby, players[2]).await;
        assert_eq!(
            texts.iter().filter(|t| t.as_str() == "[theme_dealt] theme=Beach").count(),
            2
        );
    }

    #[tokio::test]
    async fn test_deal_spyfall_location_needs_a_deck() {
        let lobby = lobby(RecordingNotifier::default());
        let (session, [alice, ..]) = full_table(&lobby).await;

        let err = lobby.deal_spyfall_location(session).await.unwrap_err();
        assert!(matches!(err, LobbyError::NoLocations));
        assert!(lobby.store().role_of(alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deal_numbers_are_distinct() {
        let lobby = lobby(RecordingNotifier::default());
        let (session, players) = full_table(&lobby).await;

        assert_eq!(lobby.deal_numbers(session).await.unwrap(), 3);

        let mut numbers: Vec<u32> = delivered(&lobby, players[2])
            .await
            .iter()
            .filter_map(|t| t.strip_prefix("[number_dealt] number="))
            .map(|n| n.parse().unwrap())
            .collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_deal_numbers_empty_session() {
        let lobby = lobby(RecordingNotifier::default());
        assert_eq!(lobby.deal_numbers(SessionId(404)).await.unwrap(), 0);
        assert!(lobby.notifier.sent().is_empty());
    }
}
