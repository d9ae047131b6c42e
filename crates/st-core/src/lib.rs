//! st-core - Core library for Stratum
//!
//! This crate provides the shared types used across all Stratum components:
//! configuration parsing, version keys, migration resources, the script
//! checksum, placeholder substitution, and resource discovery.

pub mod checksum;
pub mod config;
pub mod discovery;
pub mod error;
pub mod resource;
pub(crate) mod serde_helpers;
pub mod transform;
pub mod version;

pub use checksum::compute_checksum;
pub use config::{DatabaseConfig, MigrationConfig};
pub use discovery::{DirectorySource, ResourceSource, StaticSource};
pub use error::{CoreError, CoreResult};
pub use resource::{MigrationKind, MigrationResource};
pub use transform::ScriptTransform;
pub use version::VersionKey;
