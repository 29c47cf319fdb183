//! Resolution mode - which half of a record feeds template resolution

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Selects whether field extraction reads the record key or the record value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Decode the record key bytes
    Key,
    /// Decode the record value bytes
    #[default]
    Message,
}

impl ResolutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionMode {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "key" => Ok(Self::Key),
            "message" => Ok(Self::Message),
            other => Err(ContractError::config_validation(
                "parameter_source",
                format!("expected 'key' or 'message', got '{other}'"),
            )),
        }
    }
}
