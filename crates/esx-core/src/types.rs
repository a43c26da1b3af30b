pub use esx_schema::{
    CatalogError, Dependencies, DependencyDescription, FilePatch, PackageMap, PackageMeta,
    PackageName, PackageRecord, PatchCatalog, PatchSet, Transform, Version,
};
