//! Authentication Module
//!
//! Handles signup, login, and session management. Users, sessions and
//! profiles live in the shared SQLite pool; live sessions are cached in
//! memory together with the UI theme chosen for that session.

pub mod handlers;
pub mod middleware;

use std::collections::HashMap;

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::{Error, Result};
use crate::core::models::{Profile, Theme};

/// Shortest password accepted at signup
pub const MIN_PASSWORD_LEN: usize = 6;

/// Session token for authenticated requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Held for the lifetime of the session only
    #[serde(default)]
    pub theme: Theme,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Auth manager handles all authentication
pub struct AuthManager {
    db: SqlitePool,
    session_days: i64,
    bcrypt_cost: u32,
    /// In-memory session cache
    sessions: RwLock<HashMap<String, Session>>,
}

impl AuthManager {
    pub fn new(db: SqlitePool, session_days: i64, bcrypt_cost: u32) -> Self {
        Self {
            db,
            session_days,
            bcrypt_cost,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new user; the profile row is created alongside the user.
    pub async fn signup(&self, email: &str, full_name: &str, password: &str) -> Result<Profile> {
        let email = normalize_email(email);
        let full_name = full_name.trim();

        if email.is_empty() || !email.contains('@') {
            return Err(Error::BadRequest("A valid email is required".to_string()));
        }
        if full_name.is_empty() {
            return Err(Error::BadRequest("Full name is required".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::BadRequest(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.db)
            .await?;
        if existing.is_some() {
            return Err(Error::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash(password, self.bcrypt_cost)?;
        let profile = Profile {
            id: Uuid::new_v4().to_string(),
            full_name: full_name.to_string(),
            email: email.clone(),
            avatar_url: None,
        };

        let mut tx = self.db.begin().await?;
        sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)")
            .bind(&profile.id)
            .bind(&email)
            .bind(&password_hash)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO profiles (id, full_name, email, avatar_url) VALUES (?, ?, ?, NULL)")
            .bind(&profile.id)
            .bind(&profile.full_name)
            .bind(&profile.email)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("[Auth] User registered: {} ({})", profile.full_name, email);

        Ok(profile)
    }

    /// Login user and create session
    pub async fn login(&self, email: &str, password: &str) -> Result<(Profile, Session)> {
        let email = normalize_email(email);

        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, password_hash FROM users WHERE email = ?")
                .bind(&email)
                .fetch_optional(&self.db)
                .await?;

        let Some((user_id, password_hash)) = row else {
            warn!("[Auth] Login for unknown email {}", email);
            return Err(Error::LoginFail);
        };

        if !verify(password, &password_hash)? {
            warn!("[Auth] Failed login attempt for {}", email);
            return Err(Error::LoginFail);
        }

        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(&user_id)
            .execute(&self.db)
            .await?;

        let session = self.create_session(&user_id).await?;
        let profile = self.get_profile(&user_id).await?;

        info!("[Auth] User logged in: {}", profile.full_name);

        Ok((profile, session))
    }

    async fn create_session(&self, user_id: &str) -> Result<Session> {
        self.prune_expired().await?;

        let now = Utc::now();
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + Duration::days(self.session_days),
            theme: Theme::default(),
        };

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(session_time(session.created_at))
        .bind(session_time(session.expires_at))
        .execute(&self.db)
        .await?;

        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());

        Ok(session)
    }

    /// Resolve a token to its live session.
    pub async fn validate_session(&self, token: &str) -> Result<Session> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(token) {
                if !session.is_expired() {
                    return Ok(session.clone());
                }
            }
        }

        // Sessions issued before a restart are only in the database
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;

        let Some((token, user_id, created_at, expires_at)) = row else {
            return Err(Error::LoginFail);
        };

        let expires_at: DateTime<Utc> = expires_at
            .parse()
            .map_err(|_| Error::Internal("Invalid session date".to_string()))?;
        let session = Session {
            token,
            user_id,
            created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
            expires_at,
            theme: Theme::default(),
        };

        if session.is_expired() {
            self.sessions.write().await.remove(&session.token);
            return Err(Error::LoginFail);
        }

        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());

        Ok(session)
    }

    /// Drop expired sessions from the cache and the sessions table.
    pub async fn prune_expired(&self) -> Result<u64> {
        let now = Utc::now();
        self.sessions.write().await.retain(|_, s| s.expires_at > now);

        let removed = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(session_time(now))
            .execute(&self.db)
            .await?
            .rows_affected();
        if removed > 0 {
            info!("[Auth] Pruned {} expired sessions", removed);
        }

        Ok(removed)
    }

    /// Logout user (invalidate session)
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.write().await.remove(token);

        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.db)
            .await?;

        info!("[Auth] Session invalidated");

        Ok(())
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Profile> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, full_name, email, avatar_url FROM profiles WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    /// Update display metadata. An empty avatar reference clears it.
    pub async fn update_metadata(
        &self,
        user_id: &str,
        full_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<Profile> {
        if let Some(full_name) = full_name {
            let full_name = full_name.trim();
            if full_name.is_empty() {
                return Err(Error::BadRequest("Full name cannot be empty".to_string()));
            }
            sqlx::query("UPDATE profiles SET full_name = ? WHERE id = ?")
                .bind(full_name)
                .bind(user_id)
                .execute(&self.db)
                .await?;
        }

        if let Some(avatar_url) = avatar_url {
            let avatar_url = avatar_url.trim();
            let avatar_url = (!avatar_url.is_empty()).then_some(avatar_url);
            sqlx::query("UPDATE profiles SET avatar_url = ? WHERE id = ?")
                .bind(avatar_url)
                .bind(user_id)
                .execute(&self.db)
                .await?;
        }

        self.get_profile(user_id).await
    }

    pub async fn session_theme(&self, token: &str) -> Result<Theme> {
        Ok(self.validate_session(token).await?.theme)
    }

    pub async fn set_theme(&self, token: &str, theme: Theme) -> Result<Theme> {
        // Loads a database-only session into the cache first
        self.validate_session(token).await?;

        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(token).ok_or(Error::LoginFail)?;
        session.theme = theme;

        info!("[Auth] Theme set to {}", theme.as_str());

        Ok(theme)
    }
}

/// Fixed-width UTC timestamps so the sessions table compares them as text
fn session_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn manager() -> (tempfile::TempDir, AuthManager) {
        let dir = tempdir().unwrap();
        let db = crate::core::db::connect(&dir.path().join("auth.sqlite"))
            .await
            .unwrap();
        (dir, AuthManager::new(db, 30, 4))
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let (_dir, auth) = manager().await;

        let profile = auth
            .signup("Ada@Example.com ", "Ada Lovelace", "analytical")
            .await
            .unwrap();
        assert_eq!(profile.email, "ada@example.com");

        let (logged_in, session) = auth.login("ada@example.com", "analytical").await.unwrap();
        assert_eq!(logged_in.id, profile.id);
        assert_eq!(session.user_id, profile.id);
        assert_eq!(session.theme, Theme::System);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (_dir, auth) = manager().await;
        auth.signup("a@b.c", "A", "secret1").await.unwrap();

        let err = auth.signup("A@B.C", "Other", "secret2").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let (_dir, auth) = manager().await;
        auth.signup("a@b.c", "A", "secret1").await.unwrap();

        let err = auth.login("a@b.c", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, Error::LoginFail));
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let (_dir, auth) = manager().await;
        auth.signup("a@b.c", "A", "secret1").await.unwrap();
        let (_, session) = auth.login("a@b.c", "secret1").await.unwrap();

        assert!(auth.validate_session(&session.token).await.is_ok());
        auth.logout(&session.token).await.unwrap();
        assert!(auth.validate_session(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_pruned() {
        let dir = tempdir().unwrap();
        let db = crate::core::db::connect(&dir.path().join("auth.sqlite"))
            .await
            .unwrap();
        let expired = AuthManager::new(db.clone(), 0, 4);
        expired.signup("a@b.c", "A", "secret1").await.unwrap();
        expired.login("a@b.c", "secret1").await.unwrap();
        expired.login("a@b.c", "secret1").await.unwrap();

        let live = AuthManager::new(db.clone(), 30, 4);
        let (_, kept) = live.login("a@b.c", "secret1").await.unwrap();

        // The live login already swept both abandoned sessions
        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        assert_eq!(expired.prune_expired().await.unwrap(), 0);
        assert!(expired.sessions.read().await.is_empty());
        assert!(live.validate_session(&kept.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_theme_is_per_session() {
        let (_dir, auth) = manager().await;
        auth.signup("a@b.c", "A", "secret1").await.unwrap();
        let (_, first) = auth.login("a@b.c", "secret1").await.unwrap();
        let (_, second) = auth.login("a@b.c", "secret1").await.unwrap();

        auth.set_theme(&first.token, Theme::Dark).await.unwrap();

        assert_eq!(auth.session_theme(&first.token).await.unwrap(), Theme::Dark);
        assert_eq!(
            auth.session_theme(&second.token).await.unwrap(),
            Theme::System
        );
    }

    #[tokio::test]
    async fn test_update_metadata_clears_empty_avatar() {
        let (_dir, auth) = manager().await;
        let profile = auth.signup("a@b.c", "A", "secret1").await.unwrap();

        let updated = auth
            .update_metadata(&profile.id, None, Some("avatars/a.png".into()))
            .await
            .unwrap();
        assert_eq!(updated.avatar_url.as_deref(), Some("avatars/a.png"));

        let cleared = auth
            .update_metadata(&profile.id, Some(" Ada ".into()), Some("".into()))
            .await
            .unwrap();
        assert_eq!(cleared.full_name, "Ada");
        assert_eq!(cleared.avatar_url, None);
    }
}
