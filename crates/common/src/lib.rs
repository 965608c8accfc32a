//! Common utilities for matcha crates.
//!
//! This crate provides the shared infrastructure used across the matcha
//! workspace:
//!
//! - [`trace`] - Per-component tracing controlled via `MATCHA_DEBUG`
//! - [`intern`] - String interning using arena allocation

pub mod intern;
pub mod trace;

pub use intern::StringInterner;
pub use trace::{tracer, Tracer};
