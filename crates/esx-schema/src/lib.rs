//! Shared types and wire formats for esx.
//!
//! Everything the engine exchanges with its collaborators lives here: the
//! patch catalog document, dependency descriptions from the resolver, and
//! the flattened package map the patcher and projections work from.

pub mod catalog;
pub mod dependency;
pub mod package;
pub mod transform;
pub mod types;
pub mod version;

// Re-exports
pub use catalog::{CatalogError, FilePatch, PatchCatalog, PatchSet};
pub use dependency::{Dependencies, DependencyDescription, MainFiles, PackageMeta};
pub use package::{PackageMap, PackageRecord};
pub use transform::{AstStep, NodePath, Transform};
pub use types::*;
