//! Ordered pool of model clients with per-client retry and cross-client failover.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::llm_client::{ChatBackend, GroqClient};

/// Backoff after a failed attempt is `BACKOFF_UNIT * attempt`.
const BACKOFF_UNIT: Duration = Duration::from_millis(500);

/// One configured client and the label it reports in responses.
#[derive(Clone)]
pub struct PooledClient {
    pub label: String,
    pub backend: Arc<dyn ChatBackend>,
}

/// Raw model text plus the client that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub client_used: String,
}

/// Immutable after startup. Shared across requests behind an `Arc`.
pub struct ClientPool {
    clients: Vec<PooledClient>,
}

impl ClientPool {
    /// Builds a pool from backends in priority order, labelling them `client1`, `client2`, ...
    pub fn new(backends: Vec<Arc<dyn ChatBackend>>) -> Self {
        let clients = backends
            .into_iter()
            .enumerate()
            .map(|(i, backend)| PooledClient {
                label: format!("client{}", i + 1),
                backend,
            })
            .collect();
        Self { clients }
    }

    /// Builds one HTTP client per present credential slot.
    /// Absent slots are skipped silently; slots that fail to initialize are logged and dropped.
    pub fn from_credentials(credentials: &[Option<String>], api_url: &str, timeout: Duration) -> Self {
        let mut backends: Vec<Arc<dyn ChatBackend>> = Vec::new();
        let mut configured = Vec::new();

        for (slot, credential) in credentials.iter().enumerate() {
            let Some(api_key) = credential else {
                continue;
            };
            match GroqClient::new(api_key.clone(), api_url.to_string(), timeout) {
                Ok(client) => {
                    backends.push(Arc::new(client));
                    configured.push(format!("slot {}", slot + 1));
                }
                Err(e) => error!("Failed to initialize model client for slot {}: {e}", slot + 1),
            }
        }

        if !configured.is_empty() {
            info!("Configured model clients: {}", configured.join(", "));
        }

        Self::new(backends)
    }

    pub fn available_clients(&self) -> &[PooledClient] {
        &self.clients
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Tries each client in order, up to `max_attempts_per_client` times each.
    /// Returns the first successful response, or `None` when nothing is configured
    /// or every attempt failed. Never errors.
    pub async fn call_with_failover(
        &self,
        system_prompt: &str,
        user_message: &str,
        max_attempts_per_client: u32,
    ) -> Option<ModelResponse> {
        if self.is_empty() {
            return None;
        }

        for client in &self.clients {
            for attempt in 1..=max_attempts_per_client {
                info!("Calling model {} (attempt {attempt})", client.label);
                match client.backend.complete(system_prompt, user_message).await {
                    Ok(text) => {
                        return Some(ModelResponse {
                            text,
                            client_used: client.label.clone(),
                        });
                    }
                    Err(e) => {
                        let delay = BACKOFF_UNIT * attempt;
                        warn!(
                            "Model {} attempt {attempt} failed: {e}; retrying after {}ms",
                            client.label,
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        error!("All model clients failed.");
        None
    }
}
