//! # Rendezvous Test Suite
//!
//! Multi-party flows driven through the public API with in-memory wallets.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs        # Two-party direct and group indirect lifecycles
//!     ├── persistence.rs  # Save, restart, resume
//!     └── concurrency.rs  # Concurrent observers of the same traffic
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p rv-tests
//!
//! # By category
//! cargo test -p rv-tests integration::flows
//!
//! # Benchmarks
//! cargo bench -p rv-tests
//! ```

#![allow(dead_code)]

pub mod integration;
