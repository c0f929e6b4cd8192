//! Application configuration

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use eom_domain::common::split_list;
use eom_domain::{Catalog, GameRules};

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interface the HTTP server binds to
    pub server_host: String,
    /// HTTP server port
    pub server_port: u16,

    /// CORS allowed origins (comma-separated, or "*" for any). Empty disables CORS.
    pub cors_allowed_origins: Vec<String>,

    /// Directory of the built web client, served as the router fallback
    pub static_dir: Option<String>,

    /// Store configuration
    pub store: StoreConfig,

    /// Idle room cleanup
    pub cleanup: CleanupConfig,

    /// Rules applied to every new room
    pub rules: GameRules,

    /// Dreams and tokens offered in every new room
    pub catalog: Catalog,
}

/// Which backend holds rooms and users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process maps, optionally mirrored to a JSON file
    Memory { path: Option<String> },
    /// SQLite database file
    Sqlite { path: String },
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Rooms untouched for longer than this are deleted (minutes)
    pub room_ttl_minutes: u64,
    /// How often the sweeper runs (seconds)
    pub interval_seconds: u64,
}

/// A century; keeps the TTL inside `chrono::Duration`'s range.
const MAX_ROOM_TTL_MINUTES: u64 = 60 * 24 * 365 * 100;

impl CleanupConfig {
    pub fn room_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.room_ttl_minutes.min(MAX_ROOM_TTL_MINUTES) as i64)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = GameRules::default();

        let rules = GameRules {
            min_players: parse_or(&var, "MIN_PLAYERS", defaults.min_players)?,
            max_players: parse_or(&var, "MAX_PLAYERS", defaults.max_players)?,
            starting_balance: parse_or(&var, "STARTING_BALANCE", defaults.starting_balance)?,
            monthly_income: parse_or(&var, "MONTHLY_INCOME", defaults.monthly_income)?,
            ..defaults
        }
        .validate()
        .context("invalid game rules in environment")?;

        let catalog = match (var("DREAMS"), var("TOKENS")) {
            (None, None) => Catalog::default(),
            (dreams, tokens) => {
                let fallback = Catalog::default();
                Catalog::new(
                    dreams
                        .map(|d| split_list(&d))
                        .unwrap_or_else(|| fallback.dreams().to_vec()),
                    tokens
                        .map(|t| split_list(&t))
                        .unwrap_or_else(|| fallback.tokens().to_vec()),
                )
                .context("DREAMS/TOKENS must be non-empty comma lists with unique tokens")?
            }
        };

        let backend = match var("STORE_BACKEND")
            .unwrap_or_else(|| "memory".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory {
                path: var("MEMORY_STORE_PATH").filter(|p| !p.trim().is_empty()),
            },
            "sqlite" => StoreBackend::Sqlite {
                path: var("SQLITE_PATH").unwrap_or_else(|| "./data/eom.db".to_string()),
            },
            other => anyhow::bail!("STORE_BACKEND must be 'memory' or 'sqlite', got '{other}'"),
        };

        Ok(Self {
            server_host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: var("SERVER_PORT")
                .or_else(|| var("PORT"))
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,

            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or_default(),

            static_dir: var("STATIC_DIR").filter(|s| !s.trim().is_empty()),

            store: StoreConfig { backend },

            cleanup: CleanupConfig {
                room_ttl_minutes: parse_or(&var, "ROOM_TTL_MINUTES", 360)?,
                interval_seconds: parse_or(&var, "ROOM_CLEANUP_INTERVAL_SECONDS", 60)?,
            },

            rules,
            catalog,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}
