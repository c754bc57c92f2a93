//! StackShift Core Module
//!
//! The core module provides the shared infrastructure for the StackShift
//! toolkit: connection configuration for the knowledge graph store and the
//! service registry used to share single-instance components across the
//! process.

pub mod config;
pub mod registry;

pub use config::{ConfigError, GraphConfig};
pub use registry::ServiceRegistry;
