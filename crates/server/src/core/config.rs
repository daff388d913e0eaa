//! Server configuration and shared application state

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;

use crate::core::auth::AuthManager;
use crate::core::feed::ChangeFeed;

/// Configuration for the Cynefin server
#[derive(Clone, Debug)]
pub struct CynefinConfig {
    /// Directory holding the SQLite database
    pub data_dir: PathBuf,
    /// HTTP listen address
    pub bind_addr: String,
    /// Session lifetime in days
    pub session_days: i64,
    /// Number of rows in the recent chats listing
    pub recent_limit: i64,
    /// Per-conversation change feed buffer
    pub feed_capacity: usize,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl Default for CynefinConfig {
    fn default() -> Self {
        Self {
            data_dir: std::env::var("CYNEFIN_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("cynefin_data")),
            bind_addr: std::env::var("CYNEFIN_BIND")
                .unwrap_or_else(|_| "0.0.0.0:3001".to_string()),
            session_days: env_parse("CYNEFIN_SESSION_DAYS").unwrap_or(30),
            recent_limit: env_parse("CYNEFIN_RECENT_LIMIT").unwrap_or(5),
            feed_capacity: env_parse("CYNEFIN_FEED_CAPACITY").unwrap_or(256),
            bcrypt_cost: env_parse("CYNEFIN_BCRYPT_COST").unwrap_or(bcrypt::DEFAULT_COST),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl CynefinConfig {
    /// Create config with custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("cynefin.sqlite")
    }

    /// Ensure all directories exist
    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        Ok(())
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: CynefinConfig,
    pub db: SqlitePool,
    pub auth: Arc<AuthManager>,
    pub feed: Arc<ChangeFeed>,
}

impl AppState {
    /// Open the database under `config.data_dir` and wire up the managers.
    pub async fn open(config: CynefinConfig) -> anyhow::Result<Self> {
        config.ensure_dirs().await?;
        let db = crate::core::db::connect(&config.db_path()).await?;
        let auth = Arc::new(AuthManager::new(
            db.clone(),
            config.session_days,
            config.bcrypt_cost,
        ));
        let feed = Arc::new(ChangeFeed::new(config.feed_capacity));

        Ok(Self {
            config,
            db,
            auth,
            feed,
        })
    }
}
