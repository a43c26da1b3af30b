//! Flattened package records.

use std::collections::HashMap;

use crate::catalog::PatchSet;
use crate::transform::Transform;
use crate::types::{PackageName, Version};

/// A resolved package and the files the build pipeline consumes from it.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageRecord {
    /// Installed version.
    pub version: Version,
    /// Files relative to the package directory, in build order.
    pub files: Vec<String>,
    /// Catalog patches applicable to this version.
    pub patches: Option<PatchSet>,
}

impl PackageRecord {
    /// Whether `file` has a patched artifact.
    pub fn is_patched(&self, file: &str) -> bool {
        self.patches.as_ref().is_some_and(|p| p.is_patched(file))
    }

    /// Files of this package that are rewritten, with their transforms.
    pub fn patched_files(&self) -> impl Iterator<Item = (&str, &[Transform])> {
        self.files.iter().filter_map(|file| {
            let transforms = self.patches.as_ref()?.transforms_for(file)?;
            Some((file.as_str(), transforms))
        })
    }
}

/// Insertion-ordered map of package name to record.
///
/// Inserting a name that is already present replaces its record but keeps
/// the original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageMap {
    entries: Vec<(PackageName, PackageRecord)>,
    index: HashMap<PackageName, usize>,
}

impl PackageMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record, returning the previous one.
    pub fn insert(&mut self, name: PackageName, record: PackageRecord) -> Option<PackageRecord> {
        if let Some(&i) = self.index.get(&name) {
            return Some(std::mem::replace(&mut self.entries[i].1, record));
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, record));
        None
    }

    /// Look up a record by name.
    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    /// Whether a package is present.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&PackageName, &PackageRecord)> {
        self.entries.iter().map(|(n, r)| (n, r))
    }

    /// Number of packages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
