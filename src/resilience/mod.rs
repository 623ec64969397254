//! # Resilience Module
//!
//! Circuit breaker used to stop paying network timeouts on every request while
//! the distributed cache backend is unreachable.
//!
//! ## Usage
//!
//! ```rust
//! use tasktrack_core::resilience::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new("cache".to_string(), CircuitBreakerConfig::default());
//! if breaker.should_allow() {
//!     // issue the call, then report how it went
//!     breaker.record_success_manual(Duration::from_millis(3));
//! }
//! ```

pub mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
