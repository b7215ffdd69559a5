//! Centralized error types for cweather.
//!
//! This module provides a typed error hierarchy that:
//! - Provides short messages suitable for CLI output
//! - Maps every fatal error to a process exit code

use thiserror::Error;

/// Top-level error for the cweather binaries.
///
/// Only fatal conditions end up here. Per-request upstream failures are
/// turned into JSON error replies and never reach this type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a short message suitable for printing on the command line.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Transport(e) => e.user_message(),
            AppError::Other(_) => "An unexpected error occurred.",
        }
    }

    /// Process exit code for this error. All fatal errors exit with 1.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration file not found.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed.",
            ConfigError::MissingSetting(_) => "A required setting is missing.",
        }
    }
}

/// Message transport errors (connection, subscription, publishing).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect to {url}: {message}")]
    ConnectFailed { url: String, message: String },

    #[error("Failed to read credentials file {path}: {message}")]
    Credentials { path: String, message: String },

    #[error("Failed to subscribe to {subject}: {message}")]
    SubscribeFailed { subject: String, message: String },

    #[error("Failed to publish to {subject}: {message}")]
    PublishFailed { subject: String, message: String },

    #[error("Drain failed: {0}")]
    DrainFailed(String),
}

impl TransportError {
    pub fn user_message(&self) -> &'static str {
        match self {
            TransportError::ConnectFailed { .. } => {
                "Unable to connect to the message server. Check the URL."
            }
            TransportError::Credentials { .. } => "Unable to read the credentials file.",
            TransportError::SubscribeFailed { .. } => "Unable to subscribe for requests.",
            TransportError::PublishFailed { .. } => "Unable to send a message.",
            TransportError::DrainFailed(_) => "Shutdown did not complete cleanly.",
        }
    }
}
