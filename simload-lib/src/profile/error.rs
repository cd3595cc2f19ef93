use std::fmt;

use super::ClientId;

#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
/// A client profile (or set of profiles) that cannot be run.
///
/// Always fatal: it surfaces at engine setup, before any instance starts.
pub enum ConfigError {
    InvalidProfile {
        client_id: ClientId,
        field: &'static str,
        reason: String,
    },
    DuplicateClientId(ClientId),
    MissingOption {
        section: String,
        option: &'static str,
    },
    InvalidOption {
        section: String,
        option: &'static str,
        reason: String,
    },
}

impl ConfigError {
    pub(super) fn invalid(
        client_id: ClientId,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidProfile {
            client_id,
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidProfile {
                client_id,
                field,
                reason,
            } => write!(
                f,
                "ConfigError: client {client_id}: invalid value for '{field}': {reason}"
            ),
            ConfigError::DuplicateClientId(client_id) => {
                write!(f, "ConfigError: client id {client_id} is defined more than once")
            }
            ConfigError::MissingOption { section, option } => write!(
                f,
                "ConfigError: client {section} configuration not complete, missing option: {option}"
            ),
            ConfigError::InvalidOption {
                section,
                option,
                reason,
            } => write!(
                f,
                "ConfigError: client {section}: option '{option}' cannot be used: {reason}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
