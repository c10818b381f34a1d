// crates/datumplan-api/src/config.rs
// ============================================================================
// Module: Datum API Configuration
// Description: TOML server configuration with validation at load.
// Purpose: Configure the bind address and bearer-token identity mapping.
// Dependencies: serde, toml, datumplan-core
// ============================================================================

//! ## Overview
//! Server configuration is a small TOML document mapping bearer tokens to
//! actors and role sets. Configuration is validated at load: empty tokens or
//! actors and unknown roles are rejected before the server starts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use datumplan_core::Role;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Token-to-identity mapping entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// Bearer token value.
    pub token: String,
    /// Actor the token authenticates as.
    pub actor: String,
    /// Roles granted to the actor.
    pub roles: Vec<Role>,
}

/// Server configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind (e.g. `127.0.0.1:8080`).
    pub bind_addr: String,
    /// Accepted bearer tokens.
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration load and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl ServerConfig {
    /// Parses and validates a TOML configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is out of contract.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("bind_addr must not be empty".to_string()));
        }
        for entry in &self.tokens {
            if entry.token.trim().is_empty() {
                return Err(ConfigError::Invalid("token values must not be empty".to_string()));
            }
            if entry.actor.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "token entries must name a non-empty actor".to_string(),
                ));
            }
            if entry.roles.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "actor {} must carry at least one role",
                    entry.actor
                )));
            }
        }
        Ok(())
    }
}
