//! Request dispatcher.
//!
//! # Responsibilities
//! - Serve fresh cached responses without touching the network
//! - Walk ranked candidates, one attempt per endpoint, under the gate
//! - Feed every attempt outcome back into endpoint health
//! - Turn the final outcome into a `RouteResult` value
//!
//! # Design Decisions
//! - The candidate list is computed once per call; concurrent health flips
//!   do not reorder an in-progress route
//! - The gate slot is released before any delay so sleeping callers never
//!   hold capacity
//! - No delay follows the final candidate

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::cache::{CacheKey, ResponseCache};
use crate::config::DispatchConfig;
use crate::dispatch::{RequestOptions, RouteError, RouteFailure, RouteResult, RouteSuccess};
use crate::health::{passive, HistoryRecorder};
use crate::observability::metrics;
use crate::registry::{ranking, Capability, Endpoint, EndpointRegistry};
use crate::resilience::backoff::{calculate_backoff, with_jitter};
use crate::resilience::{AttemptFailure, ConcurrencyGate, GateClosed};
use crate::transport::{OutboundRequest, Transport};

/// Failure of one attempt, with the message surfaced on exhaustion.
type AttemptError = (AttemptFailure, String);

pub struct Dispatcher {
    registry: Arc<EndpointRegistry>,
    cache: Arc<ResponseCache>,
    gate: Arc<ConcurrencyGate>,
    transport: Arc<dyn Transport>,
    recorder: Arc<HistoryRecorder>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        cache: Arc<ResponseCache>,
        gate: Arc<ConcurrencyGate>,
        transport: Arc<dyn Transport>,
        recorder: Arc<HistoryRecorder>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            gate,
            transport,
            recorder,
            config,
        }
    }

    /// Route one logical request to the best available endpoint.
    ///
    /// Never returns an error or panics; every outcome is a `RouteResult`.
    pub async fn route(&self, capability: &Capability, path: &str, options: &RequestOptions) -> RouteResult {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "route",
            request_id = %request_id,
            capability = %capability,
            path = %path
        );

        let start = Instant::now();
        let result = self.route_inner(capability, path, options).instrument(span).await;
        metrics::record_route(result.outcome_label(), start);
        result
    }

    async fn route_inner(&self, capability: &Capability, path: &str, options: &RequestOptions) -> RouteResult {
        // 1. Cache
        let key = CacheKey::new(capability, path, options);
        if let Some(payload) = self.cache.get(&key) {
            tracing::debug!("Serving cached response");
            return RouteResult::Success(RouteSuccess {
                payload,
                endpoint: None,
                retries: 0,
                cache_hit: true,
            });
        }

        // 2. Candidates
        let candidates = ranking::candidates(&self.registry, capability);
        if candidates.is_empty() {
            tracing::warn!("No endpoints registered for capability");
            return RouteResult::Failure(RouteFailure {
                error: RouteError::NoEndpoints,
                message: format!("no endpoints serve capability '{}'", capability),
                retries: 0,
            });
        }

        // 3. Attempt loop
        let total = candidates.len();
        let mut last: Option<AttemptError> = None;

        for (index, endpoint) in candidates.into_iter().enumerate() {
            let attempt = index as u32 + 1;

            let permit = match self.gate.acquire().await {
                Ok(permit) => permit,
                Err(GateClosed) => {
                    tracing::info!(attempt, "Gate closed, abandoning request");
                    return RouteResult::Failure(RouteFailure {
                        error: RouteError::GateClosed,
                        message: GateClosed.to_string(),
                        retries: index as u32,
                    });
                }
            };

            let started = Instant::now();
            let outcome = self.attempt(&endpoint, path, options).await;
            permit.release();

            match outcome {
                Ok(body) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    metrics::record_attempt(&endpoint.name, "success");
                    passive::report_success(&self.recorder, &endpoint, elapsed_ms);

                    let payload: Arc<str> = Arc::from(body);
                    self.cache.put(key, payload.clone());

                    tracing::info!(endpoint = %endpoint.name, attempt, elapsed_ms, "Request succeeded");
                    return RouteResult::Success(RouteSuccess {
                        payload,
                        endpoint: Some(endpoint.name.clone()),
                        retries: index as u32,
                        cache_hit: false,
                    });
                }
                Err((failure, message)) => {
                    metrics::record_attempt(&endpoint.name, failure.label());
                    passive::report_failure(&self.recorder, &endpoint, failure);

                    tracing::warn!(
                        endpoint = %endpoint.name,
                        attempt,
                        remaining = total - attempt as usize,
                        reason = %failure,
                        error = %message,
                        "Attempt failed"
                    );

                    if (attempt as usize) < total {
                        if let Some(delay) = self.delay_after(failure, attempt) {
                            tracing::debug!(delay = ?delay, "Waiting before next candidate");
                            tokio::time::sleep(delay).await;
                        }
                    }
                    last = Some((failure, message));
                }
            }
        }

        // 4. Exhausted
        let Some((failure, message)) = last else {
            return RouteResult::Failure(RouteFailure {
                error: RouteError::NoEndpoints,
                message: format!("no endpoints serve capability '{}'", capability),
                retries: 0,
            });
        };

        tracing::error!(attempts = total, last = %failure, "All endpoints failed");
        RouteResult::Failure(RouteFailure {
            error: RouteError::Exhausted { last: failure },
            message,
            retries: total as u32,
        })
    }

    /// One GET against one endpoint; the body on 2xx.
    async fn attempt(&self, endpoint: &Endpoint, path: &str, options: &RequestOptions) -> Result<String, AttemptError> {
        let mut url = endpoint.resolve(path).map_err(|e| {
            (
                AttemptFailure::InvalidRequest,
                format!("invalid URL for endpoint '{}': {}", endpoint.name, e),
            )
        })?;
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(options.query.iter());
        }

        let mut request = OutboundRequest::new(url, self.config.request_timeout());
        request.headers = options
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        match self.transport.get(request).await {
            Ok(response) => match AttemptFailure::from_status(response.status) {
                None => Ok(response.body),
                Some(failure) => Err((
                    failure,
                    format!("endpoint '{}' returned HTTP {}", endpoint.name, response.status),
                )),
            },
            Err(e) => Err((AttemptFailure::from_transport(&e), e.to_string())),
        }
    }

    /// Delay before moving on after a failed attempt, if any.
    fn delay_after(&self, failure: AttemptFailure, attempt: u32) -> Option<Duration> {
        match failure {
            AttemptFailure::RateLimited => Some(self.config.rate_limit_delay()),
            f if f.backs_off() => {
                let delay = calculate_backoff(
                    attempt,
                    self.config.retry_base_delay_ms,
                    self.config.retry_max_delay_ms,
                );
                Some(if self.config.retry_jitter { with_jitter(delay) } else { delay })
            }
            _ => None,
        }
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn gate(&self) -> &Arc<ConcurrencyGate> {
        &self.gate
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("endpoints", &self.registry.len())
            .field("gate_limit", &self.gate.limit())
            .field("config", &self.config)
            .finish()
    }
}
