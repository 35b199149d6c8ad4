//! CLI command implementations.

pub(crate) mod codec;
pub(crate) mod save;

pub(crate) use codec::{DecodeArgs, EncodeArgs};
pub(crate) use save::SaveArgs;
