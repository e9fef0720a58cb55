//! Tool configuration.

use std::path::Path;

use bitsign_core::{FamilyPolicySpec, FamilyRegistry, PAC_CARD};
use serde::{Deserialize, Serialize};

use crate::error::{BitsignError, Result};

/// Configuration for an [`Authenticator`](crate::Authenticator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Family every bitstream is framed and checked against.
    pub family: String,
    /// Zero-pad raw payloads to 128 bytes before framing.
    pub pad_payload: bool,
    /// Families registered next to the built-in ones.
    pub extra_families: Vec<FamilyPolicySpec>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            family: PAC_CARD.to_string(),
            pad_payload: true,
            extra_families: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| BitsignError::io(path, e))?;
        Self::from_json(&json)
    }

    /// Built-in families plus `extra_families`, validated.
    pub fn registry(&self) -> Result<FamilyRegistry> {
        Ok(FamilyRegistry::builtin()?.with_specs(self.extra_families.iter().cloned())?)
    }
}
