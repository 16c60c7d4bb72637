use crate::lifecycle::{Action, Lifecycle};
use crate::model::ItemKind;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JotterError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("{}", .0.join("\n"))]
    Validation(Vec<String>),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Cannot {action} an item that is {from}")]
    InvalidTransition { action: Action, from: Lifecycle },

    #[error("Unexpected response: {0}")]
    Protocol(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification used to pick the notification and follow-up for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Transport,
    Validation,
    Authorization,
    Server,
    Client,
}

impl JotterError {
    pub fn class(&self) -> ErrorClass {
        match self {
            JotterError::Transport(_) => ErrorClass::Transport,
            JotterError::Validation(_) => ErrorClass::Validation,
            JotterError::Unauthorized(_) | JotterError::NotLoggedIn => ErrorClass::Authorization,
            JotterError::Server(_) | JotterError::Protocol(_) => ErrorClass::Server,
            JotterError::NotFound(_)
            | JotterError::InvalidTransition { .. }
            | JotterError::Config(_)
            | JotterError::Io(_)
            | JotterError::Serialization(_) => ErrorClass::Client,
        }
    }

    pub fn not_found(kind: ItemKind, id: impl std::fmt::Display) -> Self {
        JotterError::NotFound(format!("{} not found: {id}", kind.label()))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        JotterError::Validation(vec![message.into()])
    }

    pub fn is_auth(&self) -> bool {
        self.class() == ErrorClass::Authorization
    }
}

impl From<confique::Error> for JotterError {
    fn from(err: confique::Error) -> Self {
        JotterError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JotterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_joins_messages() {
        let err = JotterError::Validation(vec!["Title is required".into(), "Too long".into()]);
        assert_eq!(err.to_string(), "Title is required\nToo long");
        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[test]
    fn missing_session_is_an_authorization_failure() {
        assert!(JotterError::NotLoggedIn.is_auth());
        assert!(JotterError::Unauthorized("expired".into()).is_auth());
        assert!(!JotterError::Server("boom".into()).is_auth());
    }

    #[test]
    fn invalid_transition_reads_naturally() {
        let err = JotterError::InvalidTransition {
            action: Action::Delete,
            from: Lifecycle::Active,
        };
        assert_eq!(err.to_string(), "Cannot delete an item that is active");
    }
}
