//! In-memory backend plugin
//!
//! Implements every `backend-sdk` service inside the process: password auth
//! with opaque tokens, tables of JSON rows with auto-increment ids, and a
//! bucket store. Row-level policies are not emulated; bearer tokens on row
//! queries are accepted and ignored.
//!
//! Used by the test suites and by `console-server --mock`.
//!
//! ## Configuration
//!
//! ```yaml
//! backend:
//!   kind: memory
//!   memory:
//!     public_base_url: "http://localhost:8087"
//!     users:
//!       - email: "root@example.com"
//!         password: "change-me"
//!     tables:
//!       profiles:
//!         - { id: "550e8400-e29b-41d4-a716-446655440001", role: admin, admin_type: super_admin }
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
mod ordering;
pub mod store;

pub use config::{MemoryBackendConfig, SeedUser};
pub use store::{MemoryBackend, OpKind};
