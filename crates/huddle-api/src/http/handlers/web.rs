//! Web channel handlers used by the browser client.
//!
//! Endpoints:
//! - GET  /invite/{token} - Does the invite still lead to a session
//! - POST /join           - Become a web guest of the session behind `gameId`
//! - GET  /messages       - Poll the guest's mailbox past `lastMessageIdx`
//! - POST /send           - Deal a theme to everyone else in the session
//! - POST /spyfall        - Deal a random Spyfall location to the whole session
//! - POST /numbers        - Deal distinct numbers to the whole session
//! - POST /leave          - Leave the session and drop the guest
//!
//! Errors are reported as JSON by [`AppError`]; successful writes answer
//! with plain text, as the browser client expects.

use axum::Json;
use axum::extract::{Form, Path, Query, State};
use rand::Rng;
use serde::{Deserialize, Serialize};

use huddle_core::repository::guest::GuestRepository;
use huddle_core::repository::mailbox::MailboxRepository;
use huddle_core::repository::session::SessionRepository;
use huddle_types::ids::{GuestToken, InviteToken, SessionId, UserId};
use huddle_types::session::MemberFilter;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct InviteStatus {
    pub found: bool,
}

#[derive(Debug, Deserialize)]
pub struct JoinForm {
    #[serde(rename = "gameId", default)]
    pub game_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(rename = "playerToken", default)]
    pub player_token: Option<String>,
    #[serde(rename = "lastMessageIdx", default)]
    pub last_message_idx: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub last_message_idx: i64,
    pub players: u64,
    pub messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerForm {
    #[serde(rename = "playerToken", default)]
    pub player_token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn parse_player_token(raw: Option<&str>) -> Result<GuestToken, AppError> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::Validation("Incorrect player token".to_string()))
}

/// Resolve a guest token to its user and the session it is still part of.
async fn resolve_guest(
    state: &AppState,
    token: GuestToken,
) -> Result<(UserId, SessionId), AppError> {
    let store = state.store();
    let user_id = store
        .guest_user_id(token)
        .await?
        .ok_or_else(|| AppError::Gone("Player not found, has the game ended?".to_string()))?;
    let session_id = store
        .current_session(user_id)
        .await?
        .ok_or_else(|| AppError::Gone("Player not in session, has the game ended?".to_string()))?;
    Ok((user_id, session_id))
}

/// GET /invite/{token}
pub async fn invite_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InviteStatus>, AppError> {
    let session = state.store().session_of(&InviteToken(token)).await?;
    Ok(Json(InviteStatus {
        found: session.is_some(),
    }))
}

/// POST /join
pub async fn join_game(
    State(state): State<AppState>,
    Form(form): Form<JoinForm>,
) -> Result<String, AppError> {
    let game_id = form.game_id.filter(|g| !g.is_empty()).ok_or_else(|| {
        AppError::Validation("Incorrect game id, reload the page and try again".to_string())
    })?;

    let session_id = state
        .store()
        .session_of(&InviteToken(game_id))
        .await?
        .ok_or_else(|| AppError::Validation("Game not found. Was it ended?".to_string()))?;

    let token = GuestToken(rand::thread_rng().gen_range(0..=i64::MAX));
    if !state.lobby.add_web_guest(session_id, token).await? {
        return Err(AppError::Validation(
            "Can't add new user, try again".to_string(),
        ));
    }

    Ok(token.to_string())
}

/// GET /messages
pub async fn last_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, AppError> {
    let token = parse_player_token(query.player_token.as_deref())?;
    let last_seen: i64 = query
        .last_message_idx
        .as_deref()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| AppError::Validation("Incorrect last message index".to_string()))?;

    let (user_id, session_id) = resolve_guest(&state, token).await?;

    let batch = state.store().drain_since(user_id, last_seen).await?;
    let players = state
        .store()
        .member_count(session_id, MemberFilter::All)
        .await?;

    Ok(Json(MessagesResponse {
        last_message_idx: batch.last_seen,
        players,
        messages: batch
            .messages
            .into_iter()
            .map(|m| m.replace('\n', "<br/>"))
            .collect(),
    }))
}

/// POST /send
///
/// The sender keeps the theme to itself; one of the other members is the spy.
pub async fn send_theme(
    State(state): State<AppState>,
    Form(form): Form<PlayerForm>,
) -> Result<String, AppError> {
    let token = parse_player_token(form.player_token.as_deref())?;
    let (user_id, session_id) = resolve_guest(&state, token).await?;

    let theme = form
        .message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::Validation("The message is empty".to_string()))?;

    let spy = state
        .lobby
        .deal_roles(session_id, &theme, Some(user_id))
        .await?;
    if spy.is_none() {
        return Ok("Not enough players".to_string());
    }
    Ok("ok".to_string())
}

/// POST /spyfall
pub async fn send_spyfall_location(
    State(state): State<AppState>,
    Form(form): Form<PlayerForm>,
) -> Result<String, AppError> {
    let token = parse_player_token(form.player_token.as_deref())?;
    let (_, session_id) = resolve_guest(&state, token).await?;

    let spy = state.lobby.deal_spyfall_location(session_id).await?;
    if spy.is_none() {
        return Ok("Not enough players".to_string());
    }
    Ok("ok".to_string())
}

/// POST /numbers
pub async fn send_numbers(
    State(state): State<AppState>,
    Form(form): Form<PlayerForm>,
) -> Result<&'static str, AppError> {
    let token = parse_player_token(form.player_token.as_deref())?;
    let (_, session_id) = resolve_guest(&state, token).await?;

    state.lobby.deal_numbers(session_id).await?;
    Ok("ok")
}

/// POST /leave
pub async fn leave_game(
    State(state): State<AppState>,
    Form(form): Form<PlayerForm>,
) -> Result<&'static str, AppError> {
    let token = parse_player_token(form.player_token.as_deref())?;
    resolve_guest(&state, token).await?;

    state.lobby.remove_web_guest(token).await?;
    Ok("ok")
}
