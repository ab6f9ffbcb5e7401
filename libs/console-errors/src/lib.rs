//! Error payloads shared by the console HTTP surface.
//!
//! - RFC 9457 Problem Details (`Problem`)
//! - Static error catalog entries (`ErrDef`)
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod catalog;
pub mod problem;

pub use catalog::ErrDef;
pub use problem::{APPLICATION_PROBLEM_JSON, Problem, ValidationViolation};
