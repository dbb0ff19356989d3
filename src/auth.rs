use argon2::Argon2;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::convert::Infallible;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

use crate::app::AppState;
use crate::error::AppError;
use crate::models::UserId;
use crate::storage::Store;

pub const SESSION_COOKIE: &str = "sessionid";
pub const LOGIN_URL: &str = "/accounts/login/";
pub const DEFAULT_NEXT: &str = "/clients/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
}

pub trait IdentityProvider: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Option<Identity>;
    fn identity(&self, id: UserId) -> Option<Identity>;
}

/// Users kept alongside the tracked data.
pub struct LocalUsers {
    store: Arc<Store>,
}

impl LocalUsers {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn register(&self, username: &str, password: &str) -> Result<Identity, AppError> {
        let password_hash = hash_password(password).map_err(AppError::PasswordHash)?;
        let user = self.store.write(|db| {
            if db.user_by_name(username).is_some() {
                return None;
            }
            Some(db.insert_user(username, password_hash))
        })?;
        let user = user.ok_or_else(|| AppError::UsernameTaken(username.to_string()))?;
        tracing::info!(user_id = user.id, username, "registered user");
        Ok(Identity {
            id: user.id,
            username: user.username,
        })
    }
}

impl IdentityProvider for LocalUsers {
    fn authenticate(&self, username: &str, password: &str) -> Option<Identity> {
        let user = self.store.read(|db| db.user_by_name(username).cloned())?;
        verify_password(password, &user.password_hash).then(|| Identity {
            id: user.id,
            username: user.username,
        })
    }

    fn identity(&self, id: UserId) -> Option<Identity> {
        self.store.read(|db| {
            db.user(id).map(|user| Identity {
                id: user.id,
                username: user.username.clone(),
            })
        })
    }
}

/// Argon2id hash in PHC string form; the salt is embedded in the result.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt)?;
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            tracing::warn!(error = %err, "unreadable password hash");
            false
        }
    }
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, Clone, Copy)]
struct Session {
    user: UserId,
    expires_at: DateTime<Utc>,
}

/// In-memory session table; sessions do not survive a restart.
#[derive(Debug)]
pub struct Sessions {
    ttl: Duration,
    inner: Mutex<HashMap<String, Session>>,
}

impl Sessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a session for `user`. Expired sessions are swept on the way in.
    pub fn create(&self, user: UserId, now: DateTime<Utc>) -> String {
        let token = random_token(32);
        let session = Session {
            user,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let mut sessions = self.lock();
        sessions.retain(|_, session| session.expires_at > now);
        sessions.insert(token.clone(), session);
        token
    }

    pub fn resolve(&self, token: &str, now: DateTime<Utc>) -> Option<UserId> {
        let mut sessions = self.lock();
        let session = *sessions.get(token)?;
        if session.expires_at <= now {
            sessions.remove(token);
            return None;
        }
        Some(session.user)
    }

    pub fn remove(&self, token: &str) {
        self.lock().remove(token);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn start_session(state: &AppState, cookies: &Cookies, identity: &Identity) {
    if let Some(previous) = cookies.get(SESSION_COOKIE) {
        state.sessions.remove(previous.value());
    }
    let token = state.sessions.create(identity.id, Utc::now());
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.settings.secure_cookies)
        .build();
    cookies.add(cookie);
}

pub fn end_session(state: &AppState, cookies: &Cookies) {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    cookies.remove(Cookie::build(SESSION_COOKIE).path("/").build());
}

/// `next` is only followed when it stays on this site.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => DEFAULT_NEXT,
    }
}

fn login_redirect(parts: &Parts) -> String {
    let target = parts
        .uri
        .path_and_query()
        .map(|target| target.as_str())
        .unwrap_or("/");
    format!("{LOGIN_URL}?next={}", urlencoding::encode(target))
}

async fn session_identity(parts: &mut Parts, state: &AppState) -> Option<Identity> {
    let cookies = Cookies::from_request_parts(parts, state).await.ok()?;
    let token = cookies.get(SESSION_COOKIE)?.value().to_string();
    let user = state.sessions.resolve(&token, Utc::now())?;
    state.identity.identity(user)
}

/// Authenticated caller. Anonymous requests are sent to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl Deref for CurrentUser {
    type Target = Identity;

    fn deref(&self) -> &Identity {
        &self.0
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match session_identity(parts, state).await {
            Some(identity) => Ok(CurrentUser(identity)),
            None => {
                tracing::debug!(path = %parts.uri.path(), "anonymous request redirected to login");
                Err(Redirect::to(&login_redirect(parts)).into_response())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Identity>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(session_identity(parts, state).await))
    }
}
