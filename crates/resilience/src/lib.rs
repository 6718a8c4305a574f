//! Resilience primitives shared by the remote collaborators of talentmatch.
//!
//! Both the embedding API ([`encoder`](../encoder/index.html)) and the document
//! store talk to services that time out, rate limit, and occasionally return 5xx.
//! This crate keeps the two policies we apply to them in one place:
//!
//! - [`execute_with_retry`]: bounded retry with exponential backoff and jitter.
//!   There is no unbounded mode; `max_retries` is always finite.
//! - [`CircuitBreaker`]: stop hammering a provider after consecutive failures and
//!   probe it again after a cool-down.

mod circuit_breaker;
mod retry;
pub mod serde_millis;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use retry::{backoff_delay, execute_with_retry, is_retryable_message, RetryConfig, RetryResult};
