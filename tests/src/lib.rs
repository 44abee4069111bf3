//! # Filler Mesh Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── flows.rs        # Handshake services wired back to back in memory
//! │   └── live_nodes.rs   # Real nodes over localhost TCP
//! └── benches/
//!     └── handshake_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p fm-tests
//!
//! # By category
//! cargo test -p fm-tests integration::flows
//! cargo test -p fm-tests integration::live_nodes
//!
//! # Benchmarks
//! cargo bench -p fm-tests
//! ```

pub mod integration;
