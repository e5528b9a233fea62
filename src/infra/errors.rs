// src/infra/errors.rs — Error types for Walkly

use thiserror::Error;

/// Every failure the walk-session core can surface.
///
/// Cloneable so the engine can publish the latest one on its observable
/// snapshot while also handing it back to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalkError {
    // Location
    #[error("Location unavailable: {message}")]
    LocationUnavailable { message: String },

    // Provider / transport (retriable)
    #[error("Network error: {message}")]
    Network { message: String },

    // Provider (not retriable)
    #[error("Routing provider '{provider}' rejected credentials: {message}")]
    ProviderAuth { provider: String, message: String },

    #[error("Routing provider '{provider}' quota exceeded: {message}")]
    ProviderQuota { provider: String, message: String },

    #[error("No route found: {message}")]
    NoRouteFound { message: String },

    // Store
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    // User errors
    #[error("No user configured. Set [user] id in config.toml.")]
    Unauthenticated,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WalkError {
    pub fn location(message: impl Into<String>) -> Self {
        Self::LocationUnavailable {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn no_route(message: impl Into<String>) -> Self {
        Self::NoRouteFound {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retriable(&self) -> bool {
        matches!(self, WalkError::Network { .. })
    }

    /// Short machine-readable tag, stable across messages.
    pub fn kind(&self) -> &'static str {
        match self {
            WalkError::LocationUnavailable { .. } => "location_unavailable",
            WalkError::Network { .. } => "network_error",
            WalkError::ProviderAuth { .. } => "provider_auth_error",
            WalkError::ProviderQuota { .. } => "provider_quota_error",
            WalkError::NoRouteFound { .. } => "no_route_found",
            WalkError::Persistence { .. } => "persistence_error",
            WalkError::Unauthenticated => "unauthenticated",
            WalkError::Config(_) => "config_error",
        }
    }
}

impl From<rusqlite::Error> for WalkError {
    fn from(e: rusqlite::Error) -> Self {
        WalkError::persistence(e.to_string())
    }
}

impl From<reqwest::Error> for WalkError {
    fn from(e: reqwest::Error) -> Self {
        WalkError::network(e.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for WalkError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        WalkError::network("request timed out")
    }
}
