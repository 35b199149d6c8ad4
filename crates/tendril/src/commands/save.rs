//! `tendril save` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tendril_config::{CliSettings, Config};
use tendril_session::{
    ChannelHub, Component, DocumentSession, HttpPageWriter, RecentList, SaveState, SessionOptions,
};

use super::codec::read_input;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the save command.
#[derive(Args)]
pub(crate) struct SaveArgs {
    /// Document path, e.g. `notes/rust`.
    #[arg(long)]
    page: String,

    /// Page title.
    #[arg(long)]
    title: String,

    /// Title before this save, when renaming (default: the new title).
    #[arg(long)]
    old_title: Option<String>,

    /// Markup file holding the page body, one block per line.
    #[arg(long)]
    body: Option<PathBuf>,

    /// Tags field.
    #[arg(long)]
    tags: Option<String>,

    /// Metadata field.
    #[arg(long)]
    metadata: Option<String>,

    /// Path to configuration file (default: auto-discover tendril.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wiki server base URL (overrides config).
    #[arg(long, env = "TENDRIL_URL")]
    base_url: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl SaveArgs {
    /// Execute the save command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, the body cannot be read
    /// or the write does not succeed.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            base_url: self.base_url.clone(),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let body = match &self.body {
            Some(path) => read_input(Some(path))?,
            None => String::new(),
        };

        let writer = Arc::new(HttpPageWriter::with_timeout(
            &config.server.base_url,
            &config.server.edit_path,
            config.server.timeout(),
        ));
        output.info(&format!("Saving {} to {}...", self.page, writer.endpoint()));

        let loaded_title = self.old_title.clone().unwrap_or_else(|| self.title.clone());
        let options = SessionOptions::new(writer)
            .with_loaded_title(loaded_title)
            .with_recent(Arc::new(RecentList::new(config.editor.recent_limit)));
        let hub = ChannelHub::new();
        let session = DocumentSession::open(&hub, &self.page, options)?;

        let components = self.components(&body);
        tracing::debug!(
            count = components.len(),
            channel = %session.channel_name(),
            "Registering components"
        );
        for component in components {
            session.register(component)?;
        }
        session.save(None)?;
        let state = session.settled().await?;
        session.close().await?;

        match state {
            SaveState::Idle => {
                output.success(&format!("Saved \"{}\"", self.title));
                Ok(())
            }
            state => Err(CliError::SaveFailed(state)),
        }
    }

    /// Components registered for the document, title first.
    fn components(&self, body: &str) -> Vec<Component> {
        let mut components = vec![Component::new("title", &self.title)];
        components.extend(body_blocks(body));
        if let Some(tags) = &self.tags {
            components.push(Component::new("tags", tags));
        }
        if let Some(metadata) = &self.metadata {
            components.push(Component::new("metadata", metadata));
        }
        components
    }
}

/// One block component per body line. Blank lines are kept as empty blocks.
fn body_blocks(body: &str) -> impl Iterator<Item = Component> + '_ {
    body.split('\n')
        .enumerate()
        .map(|(index, line)| Component::new(format!("block-{}", index + 1), line))
}
