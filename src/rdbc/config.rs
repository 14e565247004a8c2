use std::{fmt, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::BatchError;

/// Environment variable holding the database URL.
pub const URL_VAR: &str = "BATCH_TX_DATABASE_URL";
/// Environment variable holding the database user.
pub const USER_VAR: &str = "BATCH_TX_DATABASE_USER";
/// Environment variable holding the database password.
pub const PASSWORD_VAR: &str = "BATCH_TX_DATABASE_PASSWORD";

fn default_create_if_missing() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Connection settings handed to a session provider.
///
/// Settings are always passed explicitly; nothing is read from process-wide
/// state except through [`DatabaseConfig::from_env`].
///
/// # Examples
///
/// ```
/// use batch_tx::rdbc::config::DatabaseConfig;
///
/// let config = DatabaseConfig::new("sqlite::memory:")
///     .username("app")
///     .password("secret")
///     .busy_timeout_ms(250);
///
/// assert_eq!(config.url(), "sqlite::memory:");
/// assert!(!format!("{:?}", config).contains("secret"));
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    url: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, skip_serializing)]
    password: Option<String>,
    #[serde(default = "default_create_if_missing")]
    create_if_missing: bool,
    #[serde(default = "default_busy_timeout_ms")]
    busy_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            username: None,
            password: None,
            create_if_missing: default_create_if_missing(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    pub fn username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Whether a missing database file is created on connect. Defaults to `true`.
    pub fn create_if_missing(mut self, create_if_missing: bool) -> Self {
        self.create_if_missing = create_if_missing;
        self
    }

    /// How long a statement waits on a locked database before failing.
    pub fn busy_timeout_ms(mut self, busy_timeout_ms: u64) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn secret(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn creates_if_missing(&self) -> bool {
        self.create_if_missing
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Parses a JSON document such as `{"url": "sqlite://bank.db", "busy_timeout_ms": 1000}`.
    pub fn from_json_str(json: &str) -> Result<Self, BatchError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BatchError::Configuration(e.to_string()))?;
        config.validated()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            BatchError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Reads the settings from `BATCH_TX_DATABASE_URL`, `BATCH_TX_DATABASE_USER`
    /// and `BATCH_TX_DATABASE_PASSWORD`. Only the URL is required.
    pub fn from_env() -> Result<Self, BatchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DatabaseConfig::from_env`] with a custom variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(URL_VAR)
            .ok_or_else(|| BatchError::Configuration(format!("{} is not set", URL_VAR)))?;

        let config = Self {
            username: lookup(USER_VAR),
            password: lookup(PASSWORD_VAR),
            ..Self::new(&url)
        };
        config.validated()
    }

    fn validated(self) -> Result<Self, BatchError> {
        if self.url.trim().is_empty() {
            return Err(BatchError::Configuration(
                "database url must not be empty".to_string(),
            ));
        }
        Ok(self)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("create_if_missing", &self.create_if_missing)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .finish()
    }
}
