//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP__ prefix)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Serialization/deserialization library for converting between Rust structs and data formats
//! - **derive macros**: Automatically generate code for common traits (Debug, Clone, Serialize, Deserialize)
//! - **Option<T>**: A value that may be absent (used for the encryption key)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Special environment variables (AUDIO_ENCRYPTION_KEY, HOST, PORT)
//! 2. Environment variables (APP__SERVER__HOST, APP__PROVIDERS__TIMEOUT_SECS, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable that carries the artifact encryption key.
pub const ENCRYPTION_KEY_ENV: &str = "AUDIO_ENCRYPTION_KEY";

/// Storage backends understood by `storage::build_store`.
pub const STORAGE_BACKENDS: &[&str] = &["local", "memory"];

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, providers, storage, security)
/// makes it easier to see which component owns which setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub storage: StorageConfig,
    pub security: SecurityConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// External translation and speech provider settings.
///
/// ## Fields:
/// - `translate_url`: Google gtx translation endpoint
/// - `tts_url`: Google translate TTS endpoint
/// - `timeout_secs`: Upper bound for every provider call (connect + response)
///
/// Pointing the URLs at a local mock is the easiest way to run the service offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub translate_url: String,
    pub tts_url: String,
    pub timeout_secs: u64,
}

/// Artifact storage settings.
///
/// ## Fields:
/// - `backend`: `"local"` (scratch directory) or `"memory"`. The memory backend
///   never evicts, so it is meant for tests and demos, not production.
/// - `scratch_dir`: Directory holding `<id>.mp3.enc` files for the local backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: String,
    pub scratch_dir: String,
}

/// Security settings.
///
/// The key is optional at the config layer so that a missing key produces a clear
/// startup error from the cipher instead of a generic deserialization failure.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub encryption_key: Option<String>,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// Default values ensure the application can start with nothing but the
/// encryption key set. There is no default key.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            providers: ProvidersConfig {
                translate_url: "https://translate.googleapis.com/translate_a/single".to_string(),
                tts_url: "https://translate.google.com/translate_tts".to_string(),
                timeout_secs: 15,
            },
            storage: StorageConfig {
                backend: "local".to_string(),
                scratch_dir: env::temp_dir()
                    .join("secure-speak-artifacts")
                    .to_string_lossy()
                    .into_owned(),
            },
            security: SecurityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP__
    /// 4. Handle special cases for HOST, PORT and AUDIO_ENCRYPTION_KEY
    ///
    /// ## Environment Variable Examples:
    /// - `APP__SERVER__PORT=3000`: Override server port
    /// - `APP__PROVIDERS__TIMEOUT_SECS=5`: Override provider timeout
    /// - `APP__STORAGE__SCRATCH_DIR=/tmp/audio`: Override scratch directory
    /// - `AUDIO_ENCRYPTION_KEY=...`: The artifact encryption key
    ///
    /// A double underscore separates sections because several field names
    /// contain single underscores.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__"),
            );

        // Deployment platforms commonly inject these without a prefix
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(key) = env::var(ENCRYPTION_KEY_ENV) {
            settings = settings.set_override("security.encryption_key", key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Provider timeout is at least one second
    /// - Storage backend is known and the scratch directory is set
    ///
    /// The encryption key is checked separately by building the cipher in `main`,
    /// so that key errors carry the cipher's precise message.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.providers.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Provider timeout must be greater than 0"));
        }

        if self.providers.translate_url.trim().is_empty() || self.providers.tts_url.trim().is_empty() {
            return Err(anyhow::anyhow!("Provider URLs cannot be empty"));
        }

        if !STORAGE_BACKENDS.contains(&self.storage.backend.as_str()) {
            return Err(anyhow::anyhow!(
                "Unknown storage backend '{}' (expected one of: {})",
                self.storage.backend,
                STORAGE_BACKENDS.join(", ")
            ));
        }

        if self.storage.backend == "local" && self.storage.scratch_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("Scratch directory cannot be empty for local storage"));
        }

        Ok(())
    }

    /// Configuration as JSON with the encryption key redacted (for the config endpoint).
    pub fn redacted_json(&self) -> serde_json::Value {
        serde_json::json!({
            "server": {
                "host": self.server.host,
                "port": self.server.port
            },
            "providers": {
                "translate_url": self.providers.translate_url,
                "tts_url": self.providers.tts_url,
                "timeout_secs": self.providers.timeout_secs
            },
            "storage": {
                "backend": self.storage.backend,
                "scratch_dir": self.storage.scratch_dir
            },
            "security": {
                "encryption_key_configured": self.security.encryption_key.is_some()
            }
        })
    }
}
