//! Per-invocation context shared by the commands.

use anyhow::Result;
use std::sync::Arc;

use esx_core::{BowerCommand, Session};

use crate::GlobalArgs;
use crate::config::Settings;
use crate::ui::Output;

pub type CliSession = Session<BowerCommand, Arc<Output>>;

#[derive(Debug, Clone)]
pub struct Context {
    pub settings: Settings,
    pub output: Arc<Output>,
}

impl Context {
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let settings = Settings::load(args)?;
        let output = Arc::new(Output::new(settings.session.root.clone(), args.verbose));
        Ok(Self { settings, output })
    }

    /// A fresh session backed by the configured bower executable.
    pub fn session(&self) -> CliSession {
        let resolver = BowerCommand::new(&self.settings.bower, &self.settings.session.root);
        Session::new(
            self.settings.session.clone(),
            resolver,
            Arc::clone(&self.output),
        )
    }

    /// A session that has run every stage short of patching.
    pub async fn resolved(&self) -> Result<CliSession> {
        let mut session = self.session();
        session.resolve().await?;
        Ok(session)
    }
}
