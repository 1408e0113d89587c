//! # Configuration Management
//!
//! Wire constants and runtime configuration for the frame protocol.
//!
//! The wire constants are fixed by the frame format and never change at runtime.
//! [`ProtocolConfig`] only covers local policy: how much payload a receiver accepts,
//! how the stream codec resynchronizes after corruption, and how logs are emitted.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Environment variables via `from_env()`
//! - Direct instantiation with defaults

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Sentinel byte opening every frame
pub const PROTOCOL_MAGIC: u8 = 0xAB;

/// Current supported protocol version
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Header length in bytes
pub const FRAME_HEADER_SIZE: usize = 8;

/// Trailing CRC32 length in bytes
pub const CHECKSUM_SIZE: usize = 4;

/// Smallest possible frame (empty payload)
pub const MIN_FRAME_SIZE: usize = FRAME_HEADER_SIZE + CHECKSUM_SIZE;

/// Largest payload the 16-bit length field can describe
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Largest possible frame
pub const MAX_FRAME_SIZE: usize = MIN_FRAME_SIZE + MAX_PAYLOAD_SIZE;

/// Default initial capacity of a stream decode buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProtocolConfig {
    /// Stream codec configuration
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProtocolConfig {
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

        if let Ok(size) = std::env::var("WIRE_PROTOCOL_MAX_PAYLOAD_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.codec.max_payload_size = val;
            }
        }

        if let Ok(policy) = std::env::var("WIRE_PROTOCOL_RESYNC_POLICY") {
            config.codec.resync_policy = policy.parse()?;
        }

        if let Ok(capacity) = std::env::var("WIRE_PROTOCOL_BUFFER_CAPACITY") {
            if let Ok(val) = capacity.parse::<usize>() {
                config.codec.initial_buffer_capacity = val;
            }
        }

        if let Ok(level) = std::env::var("WIRE_PROTOCOL_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|_| {
                ProtocolError::ConfigError(format!("Invalid log level: {level}"))
            })?;
        }

        if let Ok(json) = std::env::var("WIRE_PROTOCOL_LOG_JSON") {
            config.logging.json_format = matches!(json.as_str(), "1" | "true" | "yes");
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

    /// Validate the configuration
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.codec.validate());
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

/// What the stream codec does when buffered bytes do not start with a valid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResyncPolicy {
    /// Drop the leading byte, skip forward to the next magic byte and retry.
    #[default]
    ScanForMagic,
    /// Discard everything buffered and wait for fresh bytes.
    DropBuffer,
    /// Surface the error and leave the buffer untouched.
    Fail,
}

impl std::str::FromStr for ResyncPolicy {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "scan_for_magic" | "scan" => Ok(ResyncPolicy::ScanForMagic),
            "drop_buffer" | "drop" => Ok(ResyncPolicy::DropBuffer),
            "fail" => Ok(ResyncPolicy::Fail),
            other => Err(ProtocolError::ConfigError(format!(
                "Unknown resync policy: '{other}' (expected scan_for_magic, drop_buffer or fail)"
            ))),
        }
    }
}

/// Stream codec configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest payload accepted from the wire, at most [`MAX_PAYLOAD_SIZE`]
    pub max_payload_size: usize,

    /// Recovery strategy after an invalid header or checksum mismatch
    pub resync_policy: ResyncPolicy,

    /// Initial capacity of the decode buffer
    pub initial_buffer_capacity: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD_SIZE,
            resync_policy: ResyncPolicy::default(),
            initial_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl CodecConfig {
    /// Validate codec configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_payload_size > MAX_PAYLOAD_SIZE {
            errors.push(format!(
                "Max payload size too large: {} bytes (wire limit: {MAX_PAYLOAD_SIZE})",
                self.max_payload_size
            ));
        }

        if self.initial_buffer_capacity < MIN_FRAME_SIZE {
            errors.push(format!(
                "Initial buffer capacity too small: {} (minimum: {MIN_FRAME_SIZE})",
                self.initial_buffer_capacity
            ));
        } else if self.initial_buffer_capacity > 16 * MAX_FRAME_SIZE {
            errors.push(format!(
                "Initial buffer capacity very large: {} bytes",
                self.initial_buffer_capacity
            ));
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

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("wire-protocol"),
            log_level: Level::INFO,
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
