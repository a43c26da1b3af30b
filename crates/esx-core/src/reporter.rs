//! Reporter trait for dependency injection
//!
//! Core stages report progress and the `installed` notification through this
//! trait without being coupled to a terminal or any other front end.

use std::path::Path;

use crate::types::{PackageName, Version};

pub trait Reporter: Send + Sync {
    /// A new stage of the run has started (e.g. "Loading patch catalog").
    fn section(&self, title: &str);

    /// The update collaborator installed or upgraded a package.
    fn installed(&self, name: &PackageName, version: &Version);

    /// A patched artifact was (re)written.
    fn patched(&self, artifact: &Path);

    /// A patched artifact was newer than its inputs and left alone.
    fn up_to_date(&self, artifact: &Path);

    /// Patching a file failed.
    fn failed(&self, original: &Path, reason: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn installed(&self, name: &PackageName, version: &Version) {
        (**self).installed(name, version);
    }
    fn patched(&self, artifact: &Path) {
        (**self).patched(artifact);
    }
    fn up_to_date(&self, artifact: &Path) {
        (**self).up_to_date(artifact);
    }
    fn failed(&self, original: &Path, reason: &str) {
        (**self).failed(original, reason);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g., projections, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn installed(&self, _: &PackageName, _: &Version) {}
    fn patched(&self, _: &Path) {}
    fn up_to_date(&self, _: &Path) {}
    fn failed(&self, _: &Path, _: &str) {}
    fn warning(&self, _: &str) {}
}
