//! Page and form handlers
//!
//! Page routes never fail with a JSON error: without a valid session cookie
//! they render the sign-in form, and lists that fail to load render empty.

use crate::chat::selection::{Selection, SelectionQuery};
use crate::chat::{conversations, directory, groups, messages};
use crate::core::auth::middleware::{optional_session, session_cookie, SESSION_COOKIE};
use crate::core::auth::Session;
use crate::core::models::{Profile, Theme};
use crate::core::AppState;
use crate::pages::views;
use axum::{
    extract::{Form, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{error, info, warn};

async fn signed_in(state: &AppState, headers: &HeaderMap) -> Option<(Session, Profile)> {
    let session = optional_session(state, headers).await?;
    match state.auth.get_profile(&session.user_id).await {
        Ok(profile) => Some((session, profile)),
        Err(e) => {
            warn!("Session {} has no profile: {}", session.user_id, e);
            None
        }
    }
}

fn sign_in_page() -> Response {
    Html(views::auth_form(None)).into_response()
}

fn set_cookie(token: &str, days: i64) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        days * 24 * 60 * 60
    )
}

fn clear_cookie() -> String {
    format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

fn or_empty<T>(what: &str, result: crate::core::Result<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        error!("Failed to load {}: {}", what, e);
        Vec::new()
    })
}

/// GET /
pub async fn home(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some((session, me)) = signed_in(&state, &headers).await else {
        return sign_in_page();
    };

    let recent = or_empty(
        "recent chats",
        directory::recent_chats(&state.db, &me.id, state.config.recent_limit).await,
    );
    let users = or_empty(
        "directory",
        directory::list_directory(&state.db, &me.id).await,
    );

    Html(views::dashboard(&me, session.theme, &recent, &users)).into_response()
}

/// GET /discover
pub async fn discover(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match signed_in(&state, &headers).await {
        Some((session, _)) => Html(views::discover(session.theme)).into_response(),
        None => sign_in_page(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatsQuery {
    pub user: Option<String>,
    pub group: Option<String>,
    pub search: Option<String>,
}

/// GET /chats, optionally with `user=` or `group=` selecting a chat
pub async fn chats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ChatsQuery>,
) -> Response {
    let Some((session, me)) = signed_in(&state, &headers).await else {
        return sign_in_page();
    };

    let selection_query = SelectionQuery {
        user: query.user.clone(),
        group: query.group.clone(),
    };
    let selection = Selection::from_query(&state.db, &me.id, &selection_query)
        .await
        .unwrap_or_else(|e| {
            warn!("Ignoring chat selection: {}", e);
            Selection::None
        });

    let conversation = match &selection {
        Selection::None => None,
        Selection::Individual { id, .. } => {
            Some(conversations::resolve_direct(&state.db, &me.id, id).await)
        }
        Selection::Group { id, .. } => {
            Some(conversations::resolve_group(&state.db, &me.id, id).await)
        }
    };

    match conversation {
        Some(Ok(conversation)) => {
            let history = or_empty(
                "messages",
                messages::history(&state.db, &conversation.id).await,
            );
            Html(views::chat_window(
                session.theme,
                &me,
                &selection,
                &conversation.id,
                &history,
            ))
            .into_response()
        }
        other => {
            if let Some(Err(e)) = other {
                error!("Failed to open conversation: {}", e);
            }
            let chats = or_empty(
                "chats",
                directory::all_chats(&state.db, &me.id, query.search.as_deref()).await,
            );
            let my_groups = or_empty(
                "groups",
                groups::list_groups_for_user(&state.db, &me.id).await,
            );
            let users = or_empty(
                "directory",
                directory::list_directory(&state.db, &me.id).await,
            );
            Html(views::chats_index(
                session.theme,
                &chats,
                &my_groups,
                &users,
                query.search.as_deref(),
            ))
            .into_response()
        }
    }
}

/// GET /settings
pub async fn settings(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match signed_in(&state, &headers).await {
        Some((session, me)) => Html(views::settings(&me, session.theme)).into_response(),
        None => sign_in_page(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// POST /session/login
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    info!("POST /session/login - {}", form.email);

    match state.auth.login(&form.email, &form.password).await {
        Ok((_, session)) => (
            [(header::SET_COOKIE, set_cookie(&session.token, state.config.session_days))],
            Redirect::to("/"),
        )
            .into_response(),
        Err(e) => {
            warn!("Page login failed for {}: {}", form.email, e);
            (
                e.status(),
                Html(views::auth_form(Some("Invalid email or password"))),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

/// POST /session/signup
pub async fn signup(State(state): State<AppState>, Form(form): Form<SignupForm>) -> Response {
    info!("POST /session/signup - {}", form.email);

    let result = match state
        .auth
        .signup(&form.email, &form.full_name, &form.password)
        .await
    {
        Ok(profile) => state.auth.login(&profile.email, &form.password).await,
        Err(e) => Err(e),
    };

    match result {
        Ok((_, session)) => (
            [(header::SET_COOKIE, set_cookie(&session.token, state.config.session_days))],
            Redirect::to("/"),
        )
            .into_response(),
        Err(e) => {
            warn!("Page signup failed for {}: {}", form.email, e);
            (e.status(), Html(views::auth_form(Some(&e.to_string())))).into_response()
        }
    }
}

/// POST /session/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_cookie(&headers) {
        if let Err(e) = state.auth.logout(&token).await {
            error!("Logout failed: {}", e);
        }
    }
    ([(header::SET_COOKIE, clear_cookie())], Redirect::to("/")).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ThemeForm {
    pub theme: String,
}

/// POST /settings/theme
pub async fn set_theme(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ThemeForm>,
) -> Response {
    let Some(session) = optional_session(&state, &headers).await else {
        return Redirect::to("/").into_response();
    };

    let Some(theme) = Theme::parse(&form.theme) else {
        warn!("Unknown theme {:?}", form.theme);
        return Redirect::to("/settings").into_response();
    };

    if let Err(e) = state.auth.set_theme(&session.token, theme).await {
        error!("Failed to set theme: {}", e);
    }
    Redirect::to("/settings").into_response()
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub conversation_id: String,
    pub content: String,
    pub user: Option<String>,
    pub group: Option<String>,
}

/// POST /chats/messages, the no-script fallback of the chat window
pub async fn post_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<MessageForm>,
) -> Response {
    let Some(session) = optional_session(&state, &headers).await else {
        return Redirect::to("/").into_response();
    };

    let sent = match conversations::get_for_member(&state.db, &session.user_id, &form.conversation_id).await {
        Ok(conversation) => {
            messages::send(&state.db, &state.feed, &conversation, &session.user_id, &form.content)
                .await
                .map(|_| ())
        }
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        error!("Failed to send message: {}", e);
    }

    let back = match (form.group.as_deref(), form.user.as_deref()) {
        (Some(g), _) if !g.is_empty() => format!("/chats?group={}", urlencoding::encode(g)),
        (_, Some(u)) if !u.is_empty() => format!("/chats?user={}", urlencoding::encode(u)),
        _ => "/chats".to_string(),
    };
    Redirect::to(&back).into_response()
}

/// Fallback for every unmatched path
pub async fn not_found(uri: Uri) -> Response {
    warn!(
        "404 Error: User attempted to access non-existent route: {}",
        uri.path()
    );
    (StatusCode::NOT_FOUND, Html(views::not_found(uri.path()))).into_response()
}
