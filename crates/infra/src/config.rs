//! Service configuration loaded from environment variables.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SNAPSHOT_POLICY_ENV: &str = "LAUNDRYDESK_SNAPSHOT_POLICY";

/// What approval does when the item's quantity moved since the request was raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotPolicy {
    /// Refuse the approval with a conflict; the requester must raise a fresh request.
    #[default]
    Strict,
    /// Apply the requested quantity regardless.
    LastWriteWins,
}

impl SnapshotPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotPolicy::Strict => "strict",
            SnapshotPolicy::LastWriteWins => "last-write-wins",
        }
    }
}

impl FromStr for SnapshotPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(SnapshotPolicy::Strict),
            "last-write-wins" | "last_write_wins" => Ok(SnapshotPolicy::LastWriteWins),
            other => Err(ConfigError::InvalidValue {
                key: SNAPSHOT_POLICY_ENV,
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig {
    pub snapshot_policy: SnapshotPolicy,
}

impl WorkflowConfig {
    /// Read `LAUNDRYDESK_SNAPSHOT_POLICY` (`strict` when unset).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`WorkflowConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let snapshot_policy = match lookup(SNAPSHOT_POLICY_ENV) {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => SnapshotPolicy::default(),
        };

        Ok(Self { snapshot_policy })
    }
}
