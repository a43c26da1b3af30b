pub mod ast;
pub mod flatten;
pub mod hooks;
pub mod io;
pub mod manifest;
pub mod patch;
pub mod paths;
pub mod project;
pub mod resolver;
pub mod session;
pub mod types;

pub mod reporter;

pub use hooks::HookRegistry;
pub use reporter::{NullReporter, Reporter};
pub use resolver::{BowerCommand, InstalledTree, PackageResolver, ResolveOptions};
pub use session::{RunState, Session, SessionError, SessionOptions};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("esx-core/", env!("CARGO_PKG_VERSION"));
