// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Functional tests for complete build runs.
//!
//! These tests drive the real orchestrator end to end WITHOUT a live
//! Kubernetes cluster: an in-memory cluster records every call and a
//! scripted prompter answers credential prompts. The Tokio clock is paused,
//! so settle delays and poll intervals cost nothing.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run specific test
//! cargo test --test functional test_local_context_without_push
//! ```
//!
//! ## Test Categories
//!
//! - **Scenario tests**: local and remote contexts, push and no-push
//! - **Manifest tests**: authored manifests, manifest mode failures
//! - **Teardown tests**: the wait/delete/status matrix against a live run

mod manifest_tests;
mod teardown_tests;

pub use harness::*;
