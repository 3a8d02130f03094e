//! # Configuration Management
//!
//! Centralized configuration for the fallback gate.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides (`FALLBACK_*`)
//!
//! ## Security Considerations
//! - A short `max_duration` keeps idle bots from holding sessions open
//! - `debug_traces` puts decoder detail into error text and must stay off in production
//! - The frame cap bounds how much a single peer can make the gate buffer

use crate::core::frame::DEFAULT_MAX_FRAME_SIZE;
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default number of wrong answers allowed
pub const DEFAULT_MAX_TRIES: u32 = 3;

/// Default time a player has to type the code
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(45);

/// Characters that stay distinguishable when rendered on a map
pub const DEFAULT_ALPHABET: &str = "abcdefhjkmnoprstuxyz";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FallbackConfig {
    #[serde(default)]
    pub verification: VerificationConfig,

    #[serde(default)]
    pub captcha: CaptchaConfig,

    #[serde(default)]
    pub messages: MessagesConfig,

    /// Settings read by the persistence collaborator
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FallbackConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(val) = env_parse::<u32>("FALLBACK_MAX_TRIES") {
            config.verification.max_tries = val;
        }

        if let Some(val) = env_parse::<u64>("FALLBACK_MAX_DURATION_MS") {
            config.verification.max_duration = Duration::from_millis(val);
        }

        if let Ok(mode) = std::env::var("FALLBACK_GAMEMODE") {
            config.verification.gamemode = mode.parse()?;
        }

        if let Some(val) = env_parse::<bool>("FALLBACK_DEBUG_TRACES") {
            config.verification.debug_traces = val;
        }

        if let Some(val) = env_parse::<usize>("FALLBACK_PRECOMPUTE") {
            config.captcha.precompute = val;
        }

        if let Ok(alphabet) = std::env::var("FALLBACK_CAPTCHA_ALPHABET") {
            config.captcha.alphabet = alphabet;
        }

        if let Ok(level) = std::env::var("FALLBACK_LOG_LEVEL") {
            config.logging.log_level = level
                .parse()
                .map_err(|_| ProtocolError::ConfigError(format!("Invalid log level: {level}")))?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.verification.validate());
        errors.extend(self.captcha.validate());
        errors.extend(self.messages.validate());
        errors.extend(self.database.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Game mode the verification world runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gamemode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl Gamemode {
    /// Only these modes show the experience bar used for the countdown
    pub fn is_survival_or_adventure(self) -> bool {
        matches!(self, Gamemode::Survival | Gamemode::Adventure)
    }
}

impl std::str::FromStr for Gamemode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "survival" => Ok(Gamemode::Survival),
            "creative" => Ok(Gamemode::Creative),
            "adventure" => Ok(Gamemode::Adventure),
            "spectator" => Ok(Gamemode::Spectator),
            other => Err(ProtocolError::ConfigError(format!("Invalid gamemode: {other}"))),
        }
    }
}

/// Session budget and decoder settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Wrong answers allowed before the session fails
    pub max_tries: u32,

    /// Time allowed from stage entry to a correct answer
    #[serde(with = "duration_serde")]
    pub max_duration: Duration,

    pub gamemode: Gamemode,

    /// Reject names outside `[A-Za-z0-9_]{1,16}`
    pub validate_usernames: bool,

    /// Descriptive malformed-packet errors
    pub debug_traces: bool,

    /// Largest inbound frame in bytes
    pub max_frame_size: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
            max_duration: DEFAULT_MAX_DURATION,
            gamemode: Gamemode::Adventure,
            validate_usernames: true,
            debug_traces: false,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl VerificationConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_tries == 0 {
            errors.push("Max tries must be greater than 0".to_string());
        } else if self.max_tries > 100 {
            errors.push(format!("Max tries too large: {} (maximum: 100)", self.max_tries));
        }

        if self.max_duration.as_secs() < 5 {
            errors.push("Max duration too short (minimum: 5s)".to_string());
        } else if self.max_duration.as_secs() > 600 {
            errors.push("Max duration too long (maximum: 600s)".to_string());
        }

        if self.max_frame_size < 1024 {
            errors.push("Max frame size too small (minimum: 1 KB)".to_string());
        } else if self.max_frame_size > 8 * 1024 * 1024 {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum: 8 MB)",
                self.max_frame_size
            ));
        }

        if self.debug_traces {
            errors.push(
                "WARNING: Debug traces are enabled - not recommended for production".to_string(),
            );
        }

        errors
    }
}

/// Challenge generation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// Challenges kept ready in the pool
    pub precompute: usize,

    /// Refill starts once the pool drops below this
    pub refill_threshold: usize,

    /// Characters answers are drawn from
    pub alphabet: String,

    /// Characters per answer
    pub length: usize,

    /// Height of the barrier platform the player is held on
    pub platform_y: i32,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            precompute: 500,
            refill_threshold: 100,
            alphabet: DEFAULT_ALPHABET.to_string(),
            length: 5,
            platform_y: 255,
        }
    }
}

impl CaptchaConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.precompute == 0 {
            errors.push("Precompute must be greater than 0".to_string());
        } else if self.precompute > 10_000 {
            errors.push(format!(
                "Precompute too large: {} (maximum: 10,000)",
                self.precompute
            ));
        }

        if self.refill_threshold > self.precompute {
            errors.push("Refill threshold cannot be larger than precompute".to_string());
        }

        if self.alphabet.is_empty() {
            errors.push("CAPTCHA alphabet cannot be empty".to_string());
        } else if let Some(c) = self
            .alphabet
            .chars()
            .find(|c| !c.is_ascii_alphanumeric())
        {
            errors.push(format!("Unsupported CAPTCHA character: '{c}'"));
        }

        if self.length == 0 || self.length > 6 {
            errors.push(format!(
                "Invalid CAPTCHA length: {} (valid range: 1-6)",
                self.length
            ));
        }

        if !(-64..=319).contains(&self.platform_y) {
            errors.push(format!(
                "Platform height out of world bounds: {}",
                self.platform_y
            ));
        }

        errors
    }
}

/// Player-facing text. `&` colour codes are translated.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub currently_preparing: String,
    pub enter_code: String,
    pub incorrect_captcha: String,
    pub too_many_attempts: String,
    pub took_too_long: String,
    pub invalid_username: String,
    pub unexpected_error: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            currently_preparing: "&eThe verification is still being prepared. Please reconnect in a few seconds."
                .to_string(),
            enter_code: "&7Please enter the code shown on the map in chat.".to_string(),
            incorrect_captcha: "&cThe code you entered is incorrect. Please try again.".to_string(),
            too_many_attempts: "&cYou entered the wrong code too many times.".to_string(),
            took_too_long: "&cYou took too long to enter the code.".to_string(),
            invalid_username: "&cYour username contains invalid characters.".to_string(),
            unexpected_error: "&cAn unexpected error occurred during verification.".to_string(),
        }
    }
}

impl MessagesConfig {
    pub fn validate(&self) -> Vec<String> {
        [
            ("currently_preparing", &self.currently_preparing),
            ("enter_code", &self.enter_code),
            ("incorrect_captcha", &self.incorrect_captcha),
            ("too_many_attempts", &self.too_many_attempts),
            ("took_too_long", &self.took_too_long),
            ("invalid_username", &self.invalid_username),
            ("unexpected_error", &self.unexpected_error),
        ]
        .into_iter()
        .filter(|(_, text)| text.trim().is_empty())
        .map(|(name, _)| format!("Message '{name}' cannot be empty"))
        .collect()
    }
}

/// Persistence settings, consumed outside this crate
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Cap on rows returned by a single query
    pub query_limit: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { query_limit: 100_000 }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.query_limit == 0 {
            errors.push("Query limit must be greater than 0".to_string());
        }
        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("fallback-gate"),
            log_level: Level::INFO,
            log_to_console: true,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
