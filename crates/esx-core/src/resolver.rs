//! Package resolution collaborators.
//!
//! The engine never installs anything itself. It asks a [`PackageResolver`]
//! for the installed dependency tree and, when the manifest names packages
//! that are not installed, asks it to update.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

use crate::manifest::{MANIFEST_FILE, ResolverConfig};
use crate::types::{Dependencies, DependencyDescription, PackageMeta, PackageName};

/// Metadata file the package manager writes into each installed package.
pub const INSTALLED_META_FILE: &str = ".bower.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Resolve from the local cache only.
    pub offline: bool,
}

#[async_trait]
pub trait PackageResolver: Send + Sync {
    /// The installed dependency tree. Its `dependencies` feed the flattener.
    async fn list(
        &self,
        options: &ResolveOptions,
        config: &ResolverConfig,
    ) -> Result<DependencyDescription>;

    /// Install or upgrade `packages` (all manifest dependencies when empty)
    /// and return the packages that changed.
    async fn update(
        &self,
        packages: &[PackageName],
        options: &ResolveOptions,
        config: &ResolverConfig,
    ) -> Result<Dependencies>;
}

/// Reads the installed tree from `<root>/<directory>/<name>/.bower.json`.
///
/// Read-only: `update` fails, since there is nothing to install with.
#[derive(Debug, Clone)]
pub struct InstalledTree {
    root: PathBuf,
}

impl InstalledTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build the tree rooted at the project manifest.
    ///
    /// # Errors
    ///
    /// Fails if the manifest or an installed package's metadata exists but
    /// is not valid JSON.
    pub async fn scan(&self, config: &ResolverConfig) -> Result<DependencyDescription> {
        let install_dir = self.root.join(config.directory());
        let meta = read_meta(&self.root.join(MANIFEST_FILE))
            .await?
            .unwrap_or_default();

        let mut path = HashSet::new();
        let dependencies = scan_dependencies(&install_dir, &meta, &mut path).await?;
        Ok(DependencyDescription {
            meta,
            missing: false,
            dependencies,
        })
    }
}

#[async_trait]
impl PackageResolver for InstalledTree {
    async fn list(
        &self,
        _options: &ResolveOptions,
        config: &ResolverConfig,
    ) -> Result<DependencyDescription> {
        self.scan(config).await
    }

    async fn update(
        &self,
        _packages: &[PackageName],
        _options: &ResolveOptions,
        config: &ResolverConfig,
    ) -> Result<Dependencies> {
        bail!(
            "Cannot install packages into {}: no package manager configured",
            self.root.join(config.directory()).display()
        )
    }
}

/// Describe every dependency declared by `meta`. `path` holds the names on
/// the current branch; a name seen again there is recorded without children.
fn scan_dependencies<'a>(
    install_dir: &'a Path,
    meta: &'a PackageMeta,
    path: &'a mut HashSet<String>,
) -> futures::future::BoxFuture<'a, Result<Dependencies>> {
    Box::pin(async move {
        let mut out = Dependencies::new();
        for name in meta.dependencies.keys() {
            let desc = match read_installed(&install_dir.join(name)).await? {
                None => DependencyDescription::missing(),
                Some(child) if path.contains(name) => {
                    debug!(package = %name, "dependency cycle, not descending");
                    DependencyDescription {
                        meta: child,
                        ..DependencyDescription::default()
                    }
                }
                Some(child) => {
                    path.insert(name.clone());
                    let dependencies = scan_dependencies(install_dir, &child, path).await?;
                    path.remove(name);
                    DependencyDescription {
                        meta: child,
                        missing: false,
                        dependencies,
                    }
                }
            };
            out.insert(PackageName::new(name), desc);
        }
        Ok(out)
    })
}

/// Metadata of an installed package, preferring `.bower.json`.
async fn read_installed(package_dir: &Path) -> Result<Option<PackageMeta>> {
    if let Some(meta) = read_meta(&package_dir.join(INSTALLED_META_FILE)).await? {
        return Ok(Some(meta));
    }
    read_meta(&package_dir.join(MANIFEST_FILE)).await
}

async fn read_meta(path: &Path) -> Result<Option<PackageMeta>> {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    let meta = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(meta))
}

/// Runs the external `bower` executable for updates and reads the result
/// back with [`InstalledTree`].
#[derive(Debug, Clone)]
pub struct BowerCommand {
    program: String,
    tree: InstalledTree,
}

impl BowerCommand {
    pub fn new(program: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            tree: InstalledTree::new(root),
        }
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        info!(program = %self.program, ?args, "running package manager");
        let output = match Command::new(&self.program)
            .args(args)
            .current_dir(self.tree.root())
            .output()
            .await
        {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                bail!("'{}' not found. Install it with: npm install -g bower", self.program);
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to spawn {}", self.program)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} {} failed: {}", self.program, args.join(" "), stderr.trim());
        }
        Ok(())
    }
}

#[async_trait]
impl PackageResolver for BowerCommand {
    async fn list(
        &self,
        options: &ResolveOptions,
        config: &ResolverConfig,
    ) -> Result<DependencyDescription> {
        self.tree.list(options, config).await
    }

    async fn update(
        &self,
        packages: &[PackageName],
        options: &ResolveOptions,
        config: &ResolverConfig,
    ) -> Result<Dependencies> {
        let before = installed_versions(&self.tree.scan(config).await?.dependencies);

        let mut args = vec!["update".to_string()];
        args.extend(packages.iter().map(ToString::to_string));
        if options.offline {
            args.push("--offline".to_string());
        }
        args.push(format!("--config.directory={}", config.directory()));
        self.run(&args).await?;

        let after = self.tree.scan(config).await?;
        Ok(changed_packages(&after.dependencies, &before))
    }
}

/// Every installed package in the tree with its version.
fn installed_versions(deps: &Dependencies) -> BTreeMap<PackageName, Option<String>> {
    let mut out = BTreeMap::new();
    collect_versions(deps, &mut out);
    out
}

fn collect_versions(deps: &Dependencies, out: &mut BTreeMap<PackageName, Option<String>>) {
    for (name, desc) in deps {
        if desc.missing {
            continue;
        }
        out.insert(name.clone(), desc.meta.version.clone());
        collect_versions(&desc.dependencies, out);
    }
}

/// Packages of `after` that were not installed before or changed version.
fn changed_packages(
    after: &Dependencies,
    before: &BTreeMap<PackageName, Option<String>>,
) -> Dependencies {
    let mut out = Dependencies::new();
    collect_changed(after, before, &mut out);
    out
}

fn collect_changed(
    deps: &Dependencies,
    before: &BTreeMap<PackageName, Option<String>>,
    out: &mut Dependencies,
) {
    for (name, desc) in deps {
        if desc.missing {
            continue;
        }
        if before.get(name) != Some(&desc.meta.version) {
            out.insert(name.clone(), desc.clone());
        }
        collect_changed(&desc.dependencies, before, out);
    }
}
