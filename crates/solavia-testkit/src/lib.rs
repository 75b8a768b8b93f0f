//! # SolaVia Testkit
//!
//! Testing utilities for SolaVia.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known inputs with expected outputs for cross-implementation verification
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A deterministic runtime on an in-memory store
//!
//! ## Golden Vectors
//!
//! ```rust
//! use solavia_testkit::vectors::verify_all_vectors;
//!
//! assert!(verify_all_vectors().is_empty());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use solavia_testkit::generators::json_value;
//!
//! proptest! {
//!     #[test]
//!     fn digest_is_deterministic(v in json_value()) {
//!         prop_assert_eq!(solavia_core::digest_value(&v)?, solavia_core::digest_value(&v)?);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use solavia_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! fixture.record("a", 1, "A");
//! assert!(fixture.runtime.merkle_root().is_some());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::TestFixture;
pub use generators::{json_value, leaves, state_map};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
