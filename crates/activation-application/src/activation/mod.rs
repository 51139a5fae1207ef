//! Activation wizard orchestration.

mod container;
mod propagation;
mod uploads;

pub use container::{ActivationStateContainer, ErrorState, HydrationOutcome, StepWriteReport};
pub use propagation::{JobKind, PropagationQueue, PropagationStats};
pub use uploads::UploadSideChannel;

use std::sync::Arc;

use activation_core::config::ActivationConfig;
use activation_infrastructure::{ConfigService, HttpActivationClient, ProgressCache};
use anyhow::{Context, Result};

/// Wires a container from configuration: the HTTP client for both remote
/// roles and a file-backed progress cache.
///
/// Must be called inside a tokio runtime.
pub fn build_container(
    config: &ActivationConfig,
    config_service: &ConfigService,
) -> Result<ActivationStateContainer> {
    let client = Arc::new(
        HttpActivationClient::new(config.api.clone()).context("Failed to create HTTP client")?,
    );
    let store = Arc::new(config_service.open_store(config)?);
    let cache = ProgressCache::new(store, &config.cache).context("Invalid cache settings")?;

    tracing::info!(
        "[ActivationState] Using {} with cache key '{}'",
        config.api.base_url,
        cache.key()
    );

    ActivationStateContainer::new(client.clone(), client, cache)
        .context("Failed to create activation state container")
}
