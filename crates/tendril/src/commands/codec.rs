//! `tendril encode` and `tendril decode` command implementations.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use tendril_codec::{decode_html, encode_to_presentation};

use crate::error::CliError;

/// Arguments for the encode command.
#[derive(Args)]
pub(crate) struct EncodeArgs {
    /// Markup file to encode (default: stdin).
    file: Option<PathBuf>,
}

impl EncodeArgs {
    /// Print the presentation HTML of the input markup.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let markup = read_input(self.file.as_deref())?;
        write_output(&encode_to_presentation(&markup))
    }
}

/// Arguments for the decode command.
#[derive(Args)]
pub(crate) struct DecodeArgs {
    /// Presentation HTML file to decode (default: stdin).
    file: Option<PathBuf>,
}

impl DecodeArgs {
    /// Print the markup of the input presentation HTML.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let html = read_input(self.file.as_deref())?;
        write_output(&decode_html(&html)?)
    }
}

/// Read a file, or stdin when no path is given.
pub(crate) fn read_input(path: Option<&Path>) -> Result<String, CliError> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => io::read_to_string(io::stdin())?,
    };
    Ok(content)
}

fn write_output(text: &str) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{text}")?;
    stdout.flush()?;
    Ok(())
}
