//! CLI error types.

use tendril_codec::CodecError;
use tendril_config::ConfigError;
use tendril_session::{SaveState, SessionError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Codec(#[from] CodecError),

    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("save did not complete (state: {0}); rerun with --verbose for details")]
    SaveFailed(SaveState),
}
