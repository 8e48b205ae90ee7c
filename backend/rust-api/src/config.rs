use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// MongoDB for questions/competencies/attempts, Redis for sessions
    Mongo,
    /// Process-local stores; nothing survives a restart
    Memory,
}

/// Tunables of the adaptive practice core.
#[derive(Debug, Clone, Deserialize)]
pub struct PracticeSettings {
    /// Trailing number of served questions a session avoids repeating
    pub recent_window: usize,
    /// Attempts per window when comparing recent and prior accuracy
    pub trend_window: usize,
    /// Accuracy difference that counts as improving/declining
    pub trend_margin: f64,
    pub session_ttl_seconds: u64,
    pub weak_topic_count: usize,
    pub recommendation_limit: usize,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            recent_window: 10,
            trend_window: 10,
            trend_margin: 0.10,
            session_ttl_seconds: 3600,
            weak_topic_count: 3,
            recommendation_limit: 3,
        }
    }
}

impl PracticeSettings {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.recent_window == 0 || self.trend_window == 0 {
            return Err(config::ConfigError::Message(
                "practice.recent_window and practice.trend_window must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.trend_margin) {
            return Err(config::ConfigError::Message(format!(
                "practice.trend_margin must be within [0, 1], got {}",
                self.trend_margin
            )));
        }
        if self.session_ttl_seconds == 0 {
            return Err(config::ConfigError::Message(
                "practice.session_ttl_seconds must be positive".to_string(),
            ));
        }
        if self.weak_topic_count == 0 || self.recommendation_limit == 0 {
            return Err(config::ConfigError::Message(
                "practice.weak_topic_count and practice.recommendation_limit must be positive"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub storage: StorageBackend,
    pub mongo_uri: String,
    pub redis_uri: String,
    pub mongo_database: String,
    /// JSON array of questions loaded into the memory backend at startup
    pub seed_file: Option<String>,
    pub practice: PracticeSettings,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load environment variables from root .env file (two levels up)
        // Try root .env first, then fallback to local .env
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8989".to_string());

        let storage = match settings
            .get_string("storage.backend")
            .or_else(|_| env::var("STORAGE_BACKEND"))
            .unwrap_or_else(|_| "mongo".to_string())
            .to_lowercase()
            .as_str()
        {
            "mongo" => StorageBackend::Mongo,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(config::ConfigError::Message(format!(
                    "Unknown storage backend: {}",
                    other
                )))
            }
        };

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "codecraze".to_string());

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());

        let seed_file = settings
            .get_string("storage.seed_file")
            .or_else(|_| env::var("QUESTIONS_SEED_FILE"))
            .ok()
            .filter(|path| !path.is_empty());

        let defaults = PracticeSettings::default();
        let session_ttl_seconds = match settings.get_int("practice.session_ttl_seconds") {
            Ok(value) => non_negative("practice.session_ttl_seconds", value)?,
            Err(_) => env::var("SESSION_DURATION_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.session_ttl_seconds),
        };

        let practice = PracticeSettings {
            recent_window: usize_setting(
                &settings,
                "practice.recent_window",
                defaults.recent_window,
            )?,
            trend_window: usize_setting(&settings, "practice.trend_window", defaults.trend_window)?,
            trend_margin: settings
                .get_float("practice.trend_margin")
                .unwrap_or(defaults.trend_margin),
            session_ttl_seconds,
            weak_topic_count: usize_setting(
                &settings,
                "practice.weak_topic_count",
                defaults.weak_topic_count,
            )?,
            recommendation_limit: usize_setting(
                &settings,
                "practice.recommendation_limit",
                defaults.recommendation_limit,
            )?,
        };
        practice.validate()?;

        Ok(Config {
            bind_addr,
            storage,
            mongo_uri,
            redis_uri,
            mongo_database,
            seed_file,
            practice,
        })
    }

    /// Configuration for tests and DB-less runs
    pub fn in_memory() -> Self {
        Config {
            bind_addr: "127.0.0.1:0".to_string(),
            storage: StorageBackend::Memory,
            mongo_uri: String::new(),
            redis_uri: String::new(),
            mongo_database: String::new(),
            seed_file: None,
            practice: PracticeSettings::default(),
        }
    }
}

fn non_negative(key: &str, value: i64) -> Result<u64, config::ConfigError> {
    u64::try_from(value)
        .map_err(|_| config::ConfigError::Message(format!("{} must not be negative", key)))
}

fn usize_setting(
    settings: &config::Config,
    key: &str,
    default: usize,
) -> Result<usize, config::ConfigError> {
    match settings.get_int(key) {
        Ok(value) => Ok(non_negative(key, value)? as usize),
        Err(_) => Ok(default),
    }
}
