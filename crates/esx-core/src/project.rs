//! Read-only views of the package map for downstream build steps.

use serde::Serialize;
use thiserror::Error;

use crate::paths;
use crate::types::{PackageMap, PackageName, PackageRecord};

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Package '{0}' is not installed")]
    UnknownPackage(String),
}

/// Module loader entry for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleConfig {
    /// Vendor-prefixed module name.
    pub name: String,
    /// Entry module basename without `.js`.
    pub main: String,
    /// Directory of the entry module, relative to the base directory.
    pub location: String,
}

/// The package map together with the settings its views depend on.
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    pub packages: &'a PackageMap,
    pub directory: &'a str,
    pub base_dir: &'a str,
    pub vendor_prefix: &'a str,
    pub marker: &'a str,
}

impl Projection<'_> {
    /// One module config per package that has at least one `.js` file.
    pub fn module_configs(&self) -> Vec<ModuleConfig> {
        self.packages
            .iter()
            .filter_map(|(name, record)| {
                let first = record.files.iter().find(|f| paths::is_js(f))?;
                let path = self.resolved_path(name, record, first);
                let base = paths::basename(&path);
                Some(ModuleConfig {
                    name: paths::join(self.vendor_prefix, name),
                    main: base.strip_suffix(".js").unwrap_or(base).to_string(),
                    location: paths::relative(self.base_dir, &paths::dirname(&path)),
                })
            })
            .collect()
    }

    /// Every file of every package under the install directory, naming the
    /// patched artifact where one exists.
    pub fn filenames(&self) -> Vec<String> {
        self.packages
            .iter()
            .flat_map(|(name, record)| {
                record
                    .files
                    .iter()
                    .map(move |file| self.resolved_path(name, record, file))
            })
            .collect()
    }

    /// JavaScript files of `package`: the `.js` entries of `names`, or of the
    /// package's own files when `names` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::UnknownPackage`] if `names` is empty and
    /// `package` is not in the map.
    pub fn js_for_package(
        &self,
        package: &str,
        names: &[String],
    ) -> Result<Vec<String>, ProjectError> {
        let files = if names.is_empty() {
            &self
                .packages
                .get(package)
                .ok_or_else(|| ProjectError::UnknownPackage(package.to_string()))?
                .files
        } else {
            names
        };

        let dir = paths::join(self.directory, package);
        Ok(files
            .iter()
            .filter(|f| paths::is_js(f))
            .map(|f| paths::join(&dir, f))
            .collect())
    }

    fn resolved_path(&self, name: &PackageName, record: &PackageRecord, file: &str) -> String {
        let dir = paths::join(self.directory, name);
        if record.is_patched(file) {
            paths::join(&dir, &paths::patched_name(file, self.marker))
        } else {
            paths::join(&dir, file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PatchSet, Transform, Version};

    fn record(files: &[&str], patched: &[&str]) -> PackageRecord {
        let patches = patched.iter().fold(PatchSet::new(), |set, f| {
            set.with_transforms(f, vec![Transform::PluginWrap])
        });
        PackageRecord {
            version: Version::new("1.0.0"),
            files: files.iter().map(ToString::to_string).collect(),
            patches: (!patched.is_empty()).then_some(patches),
        }
    }

    fn packages() -> PackageMap {
        let mut map = PackageMap::new();
        map.insert(
            PackageName::new("jquery"),
            record(&["dist/jquery.js"], &[]),
        );
        map.insert(
            PackageName::new("fonts"),
            record(&["fonts.css", "fonts.woff"], &[]),
        );
        map.insert(
            PackageName::new("chosen"),
            record(&["chosen.css", "chosen.jquery.js"], &["chosen.jquery.js"]),
        );
        map
    }

    fn projection(packages: &PackageMap) -> Projection<'_> {
        Projection {
            packages,
            directory: "bower_components",
            base_dir: "src",
            vendor_prefix: "vendor",
            marker: "es6",
        }
    }

    #[test]
    fn test_module_configs() {
        let packages = packages();
        let configs = projection(&packages).module_configs();
        assert_eq!(
            configs,
            vec![
                ModuleConfig {
                    name: "vendor/jquery".into(),
                    main: "jquery".into(),
                    location: "../bower_components/jquery/dist".into(),
                },
                ModuleConfig {
                    name: "vendor/chosen".into(),
                    main: "chosen.jquery.es6".into(),
                    location: "../bower_components/chosen".into(),
                },
            ]
        );
    }

    #[test]
    fn test_module_config_json_shape() {
        let packages = packages();
        let json = serde_json::to_value(&projection(&packages).module_configs()[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "vendor/jquery",
                "main": "jquery",
                "location": "../bower_components/jquery/dist"
            })
        );
    }

    #[test]
    fn test_filenames_are_patch_aware() {
        let packages = packages();
        assert_eq!(
            projection(&packages).filenames(),
            vec![
                "bower_components/jquery/dist/jquery.js",
                "bower_components/fonts/fonts.css",
                "bower_components/fonts/fonts.woff",
                "bower_components/chosen/chosen.css",
                "bower_components/chosen/chosen.jquery.es6.js",
            ]
        );
    }

    #[test]
    fn test_js_for_package() {
        let packages = packages();
        let view = projection(&packages);

        assert_eq!(
            view.js_for_package("chosen", &[]).unwrap(),
            vec!["bower_components/chosen/chosen.jquery.js"]
        );
        assert_eq!(
            view.js_for_package("chosen", &["a.js".into(), "b.css".into()])
                .unwrap(),
            vec!["bower_components/chosen/a.js"]
        );
        assert!(view.js_for_package("fonts", &[]).unwrap().is_empty());
        assert!(matches!(
            view.js_for_package("nope", &[]),
            Err(ProjectError::UnknownPackage(_))
        ));
    }

    #[test]
    fn test_js_for_uninstalled_package_with_names() {
        let packages = packages();
        assert_eq!(
            projection(&packages)
                .js_for_package("later", &["later.js".into(), "later.css".into()])
                .unwrap(),
            vec!["bower_components/later/later.js"]
        );
    }
}
