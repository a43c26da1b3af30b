//! Run state and stage sequencing.
//!
//! A [`Session`] owns the [`RunState`] of one project and drives it through
//! the stages in order: resolver config, manifest, catalog, installed tree,
//! conditional update, patching. Each stage is also public so front ends can
//! stop early (e.g. to print projections without patching).

use std::path::PathBuf;
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, info};

use crate::Reporter;
use crate::flatten::flatten;
use crate::hooks::HookRegistry;
use crate::io::fetch::{CatalogSource, FetchError, load_catalog};
use crate::manifest::{Manifest, ManifestError, ResolverConfig};
use crate::patch::{PatchError, PatchOptions, PatchReport, patch_packages};
use crate::paths;
use crate::project::Projection;
use crate::resolver::{PackageResolver, ResolveOptions};
use crate::types::{Dependencies, PackageMap, PatchCatalog, Version};

/// Default catalog location.
pub const DEFAULT_PATCHES: &str =
    "https://raw.githubusercontent.com/durko/esx-legacy/master/patch.json";

/// Default directory module locations are made relative to.
pub const DEFAULT_BASE_DIR: &str = "src";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to load patch catalog from {location}: {source}")]
    Catalog {
        location: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Package resolution failed: {0:#}")]
    Resolver(anyhow::Error),

    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Settings of one project, fixed for the session's lifetime.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Project root holding `bower.json` and `.bowerrc`.
    pub root: PathBuf,
    /// Catalog path (relative to `root`) or URL.
    pub patches: String,
    pub base_dir: String,
    pub vendor_prefix: String,
    pub marker: String,
    pub offline: bool,
}

impl SessionOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            patches: DEFAULT_PATCHES.to_string(),
            base_dir: DEFAULT_BASE_DIR.to_string(),
            vendor_prefix: String::new(),
            marker: paths::DEFAULT_MARKER.to_string(),
            offline: false,
        }
    }
}

/// Everything the stages accumulate. Reused across repeated runs.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub resolver_config: ResolverConfig,
    pub directory: String,
    pub manifest: Manifest,
    /// Hash of the manifest text at the last successful update.
    pub manifest_hash: Option<String>,
    pub packages: PackageMap,
    pub catalog: PatchCatalog,
    pub catalog_modified: Option<SystemTime>,
}

pub struct Session<P, R> {
    options: SessionOptions,
    resolver: P,
    reporter: R,
    hooks: HookRegistry,
    state: RunState,
}

impl<P: PackageResolver, R: Reporter> Session<P, R> {
    pub fn new(options: SessionOptions, resolver: P, reporter: R) -> Self {
        let hooks = HookRegistry::new(options.vendor_prefix.clone());
        Self {
            options,
            resolver,
            reporter,
            hooks,
            state: RunState {
                directory: paths::DEFAULT_DIRECTORY.to_string(),
                ..RunState::default()
            },
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn resolver(&self) -> &P {
        &self.resolver
    }

    fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            offline: self.options.offline,
        }
    }

    /// Run every stage in order and patch.
    ///
    /// # Errors
    ///
    /// Fails on the first fatal stage error; see [`SessionError`].
    pub async fn run(&mut self) -> Result<PatchReport, SessionError> {
        self.resolve().await?;
        self.patch().await
    }

    /// Every stage up to and including the conditional update.
    ///
    /// # Errors
    ///
    /// Fails if the catalog cannot be loaded, the manifest is malformed, or
    /// the resolver fails.
    pub async fn resolve(&mut self) -> Result<(), SessionError> {
        self.load_resolver_config().await;
        self.load_manifest().await;
        self.load_catalog().await?;
        self.list_installed().await?;
        self.update_if_missing().await?;
        Ok(())
    }

    /// Read `.bowerrc`. Never fails.
    pub async fn load_resolver_config(&mut self) {
        let config = ResolverConfig::load(&self.options.root).await;
        self.state.directory = config.directory().to_string();
        self.state.resolver_config = config;
        debug!(directory = %self.state.directory, "resolver config loaded");
    }

    /// Read `bower.json`. Never fails.
    pub async fn load_manifest(&mut self) {
        self.state.manifest = Manifest::load(&self.options.root).await;
    }

    /// Load the patch catalog.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Catalog`] on any read, fetch or parse error.
    pub async fn load_catalog(&mut self) -> Result<(), SessionError> {
        self.reporter.section("Loading patch catalog");
        let source = CatalogSource::parse(&self.options.patches, &self.options.root);
        let loaded = load_catalog(&source)
            .await
            .map_err(|source_err| SessionError::Catalog {
                location: source.to_string(),
                source: source_err,
            })?;
        self.state.catalog = loaded.catalog;
        self.state.catalog_modified = loaded.modified;
        Ok(())
    }

    /// Ask the resolver for the installed tree and flatten it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Resolver`] if listing fails.
    pub async fn list_installed(&mut self) -> Result<(), SessionError> {
        self.reporter.section("Reading installed packages");
        let tree = self
            .resolver
            .list(&self.resolve_options(), &self.state.resolver_config)
            .await
            .map_err(SessionError::Resolver)?;
        self.flatten(&tree.dependencies);
        info!(packages = self.state.packages.len(), "installed packages");
        Ok(())
    }

    /// Update when a manifest dependency is not installed.
    ///
    /// Returns the updated packages, or `None` when the update was skipped.
    ///
    /// # Errors
    ///
    /// Fails if the manifest is malformed or the resolver fails.
    pub async fn update_if_missing(&mut self) -> Result<Option<Dependencies>, SessionError> {
        let required = self.state.manifest.dependency_names()?;
        let missing: Vec<_> = required
            .iter()
            .filter(|name| !self.state.packages.contains(name))
            .collect();

        if missing.is_empty() {
            debug!("all manifest dependencies installed");
            return Ok(None);
        }
        debug!(?missing, "manifest dependencies not installed");
        let updated = self.update().await?;
        if updated.is_some() {
            for name in missing {
                if !self.state.packages.contains(name) {
                    self.reporter
                        .warning(&format!("{name} is still not installed after update"));
                }
            }
        }
        Ok(updated)
    }

    /// Update all packages unless the manifest is unchanged since the last
    /// update of this session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Resolver`] if the update fails.
    pub async fn update(&mut self) -> Result<Option<Dependencies>, SessionError> {
        let hash = self.state.manifest.hash();
        if self.state.manifest_hash.as_deref() == Some(hash.as_str()) {
            debug!(%hash, "manifest unchanged, skipping update");
            return Ok(None);
        }

        self.reporter.section("Updating packages");
        let updated = self
            .resolver
            .update(&[], &self.resolve_options(), &self.state.resolver_config)
            .await
            .map_err(SessionError::Resolver)?;

        for (name, desc) in &updated {
            let version = desc
                .meta
                .version
                .as_deref()
                .map_or_else(Version::none, Version::new);
            self.reporter.installed(name, &version);
        }
        self.flatten(&updated);
        self.state.manifest_hash = Some(hash);
        Ok(Some(updated))
    }

    /// Rebuild stale artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Patch`] if any file failed.
    pub async fn patch(&self) -> Result<PatchReport, SessionError> {
        self.reporter.section("Patching");
        let options = PatchOptions {
            marker: self.options.marker.clone(),
            catalog_modified: self.state.catalog_modified,
        };
        let report = patch_packages(
            &self.state.packages,
            &self.options.root,
            &self.state.directory,
            &self.hooks,
            &options,
            &self.reporter,
        )
        .await?;
        info!(
            rebuilt = report.rebuilt.len(),
            up_to_date = report.up_to_date.len(),
            "patching done"
        );
        Ok(report)
    }

    /// Read-only views of the current package map.
    pub fn projection(&self) -> Projection<'_> {
        Projection {
            packages: &self.state.packages,
            directory: &self.state.directory,
            base_dir: &self.options.base_dir,
            vendor_prefix: &self.options.vendor_prefix,
            marker: &self.options.marker,
        }
    }

    fn flatten(&mut self, deps: &Dependencies) {
        flatten(
            deps,
            &self.state.catalog,
            &self.state.directory,
            &mut self.state.packages,
        );
    }
}
