//! Shared editing sessions for Tendril documents.
//!
//! Several editing contexts (browser tabs, or any number of
//! [`DocumentSession`]s in one process) can have the same document open.
//! They share component state over a per-document channel from a
//! [`ChannelHub`], and each context runs a [`SaveCoordinator`] that lets at
//! most one write be in flight.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tendril_session::{
//!     ChannelHub, Component, DocumentSession, HttpPageWriter, SaveState, SessionOptions,
//! };
//!
//! # async fn run() -> Result<(), tendril_session::SessionError> {
//! let hub = ChannelHub::default();
//! let writer = Arc::new(HttpPageWriter::new("http://127.0.0.1:8080", "/edit"));
//! let session = DocumentSession::open(&hub, "notes", SessionOptions::new(writer))?;
//!
//! session.register(Component::new("title", "Notes"))?;
//! session.register(Component::new("block-1", "see [[Home]]"))?;
//! session.save(None)?;
//! assert_eq!(session.settled().await?, SaveState::Idle);
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

mod channel;
mod coordinator;
mod error;
mod machine;
mod message;
mod recent;
mod registry;
mod session;
mod snapshot;
mod writer;

pub use channel::{ChannelHub, channel_name};
pub use coordinator::SaveCoordinator;
pub use error::{SessionError, WriteError};
pub use machine::{SaveEvent, SaveMachine, SaveState, transition};
pub use message::{Component, ComponentKind, ContextId, Envelope, Message};
pub use recent::{RecentList, RecentPages};
pub use registry::ComponentRegistry;
pub use session::{DocumentSession, SessionOptions};
pub use snapshot::DocumentSnapshot;
pub use writer::{HttpPageWriter, PageWriter};
