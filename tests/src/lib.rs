//! # PubSub Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks for publish paths
//! └── src/integration/  # End-to-end dispatcher scenarios
//!     ├── scenarios.rs  # Routing, stop-propagation, lifecycle
//!     └── deferred.rs   # trigger_async and once-timeouts on tokio
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pubsub-tests
//!
//! # Benchmarks
//! cargo bench -p pubsub-tests
//! ```
