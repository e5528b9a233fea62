// src/route/resolver.rs — Pick and construct the configured routing provider

use std::sync::Arc;

use super::google::GoogleDirectionsProvider;
use super::mapbox::MapboxDirectionsProvider;
use super::retry::{RetryConfig, RetryProvider};
use super::RoutingProvider;
use crate::infra::config::{ProviderConfig, RoutingConfig};
use crate::infra::errors::WalkError;

/// Build the provider named in `config.provider`, reading its key from the environment.
pub fn build_provider(config: &RoutingConfig) -> Result<Arc<dyn RoutingProvider>, WalkError> {
    let section = provider_section(config)?;
    let key = std::env::var(&section.api_key_env).ok().filter(|k| !k.is_empty());
    build_provider_with_key(config, key)
}

fn provider_section(config: &RoutingConfig) -> Result<&ProviderConfig, WalkError> {
    match config.provider.as_str() {
        "google" => Ok(&config.google),
        "mapbox" => Ok(&config.mapbox),
        other => Err(WalkError::Config(format!(
            "unknown routing provider '{other}' (expected google or mapbox)"
        ))),
    }
}

/// Same as [`build_provider`] with the key supplied by the caller.
pub fn build_provider_with_key(
    config: &RoutingConfig,
    key: Option<String>,
) -> Result<Arc<dyn RoutingProvider>, WalkError> {
    let section = provider_section(config)?;
    let key = key.ok_or_else(|| WalkError::ProviderAuth {
        provider: config.provider.clone(),
        message: format!("no API key configured (set {})", section.api_key_env),
    })?;

    let provider: Arc<dyn RoutingProvider> = match config.provider.as_str() {
        "google" => {
            let mut p = GoogleDirectionsProvider::new(key);
            if let Some(url) = &section.base_url {
                p = p.with_base_url(url.clone());
            }
            Arc::new(p)
        }
        _ => {
            let mut p = MapboxDirectionsProvider::new(key)?;
            if let Some(url) = &section.base_url {
                p = p.with_base_url(url.clone());
            }
            Arc::new(p)
        }
    };

    tracing::debug!(provider = provider.id(), retries = config.max_retries, "Routing provider ready");

    if config.max_retries == 0 {
        return Ok(provider);
    }

    Ok(Arc::new(RetryProvider::with_config(
        provider,
        RetryConfig {
            max_retries: config.max_retries,
            ..RetryConfig::default()
        },
    )))
}
