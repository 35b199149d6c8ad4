//! Save coordinator for one editing context.
//!
//! Holds the context's component registry and save state machine and
//! decides, per channel message, whether a write has to be issued. Issuing
//! and awaiting the write is left to the caller, so this type stays
//! synchronous.

use crate::error::WriteError;
use crate::machine::{SaveEvent, SaveMachine, SaveState};
use crate::message::{Component, ContextId, Envelope, Message};
use crate::registry::ComponentRegistry;
use crate::snapshot::DocumentSnapshot;

/// Per-context message handler and save arbiter.
#[derive(Debug)]
pub struct SaveCoordinator {
    context: ContextId,
    registry: ComponentRegistry,
    machine: SaveMachine,
    loaded_title: String,
    in_flight: Option<DocumentSnapshot>,
}

impl SaveCoordinator {
    /// Create a coordinator for `context`. `loaded_title` is the page title
    /// when the document was loaded; it is reported as `old_title`.
    #[must_use]
    pub fn new(context: ContextId, loaded_title: impl Into<String>) -> Self {
        Self {
            context,
            registry: ComponentRegistry::new(),
            machine: SaveMachine::new(),
            loaded_title: loaded_title.into(),
            in_flight: None,
        }
    }

    /// Apply one channel message.
    ///
    /// Returns the snapshot to write when this message is a save from this
    /// context accepted in [`SaveState::Idle`]. The state is then
    /// [`SaveState::Submitting`] until [`finish_write`](Self::finish_write).
    pub fn handle(&mut self, envelope: &Envelope) -> Option<DocumentSnapshot> {
        match &envelope.message {
            Message::Register(component) => {
                self.registry.register(component.clone());
                None
            }
            Message::Unregister(id) => {
                self.registry.unregister(id);
                None
            }
            Message::Save(partial) if envelope.origin == self.context => {
                self.submit(partial.as_ref())
            }
            Message::Save(partial) => {
                // the sending context owns the write
                if let Some(partial) = partial {
                    self.merge(partial);
                }
                None
            }
        }
    }

    fn submit(&mut self, partial: Option<&Component>) -> Option<DocumentSnapshot> {
        if self.machine.state() != SaveState::Idle {
            tracing::debug!(state = %self.machine.state(), "Save dropped");
            return None;
        }

        self.machine.send(SaveEvent::Submitting);
        if let Some(partial) = partial {
            self.merge(partial);
        }
        let snapshot = DocumentSnapshot::assemble(&self.registry, &self.loaded_title);
        self.in_flight = Some(snapshot.clone());
        Some(snapshot)
    }

    fn merge(&mut self, partial: &Component) {
        if !self.registry.update_content(&partial.id, &partial.content) {
            tracing::debug!(id = %partial.id, "Ignoring save for unregistered component");
        }
    }

    /// Report the outcome of the write returned by [`handle`](Self::handle).
    ///
    /// Returns the written snapshot on success.
    pub fn finish_write(&mut self, result: Result<(), WriteError>) -> Option<DocumentSnapshot> {
        let snapshot = self.in_flight.take();
        match result {
            Ok(()) => {
                self.machine.send(SaveEvent::Complete);
                if let Some(snapshot) = &snapshot {
                    self.loaded_title.clone_from(&snapshot.title);
                }
                snapshot
            }
            Err(err) => {
                tracing::warn!(error = %err, "Save failed");
                self.machine.send(SaveEvent::Error);
                None
            }
        }
    }

    /// Leave the error state. Returns `true` if the state changed.
    pub fn reset(&mut self) -> bool {
        self.machine.send(SaveEvent::Reset)
    }

    /// Current save state.
    #[must_use]
    pub fn state(&self) -> SaveState {
        self.machine.state()
    }

    /// Context this coordinator acts for.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Component registry.
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Snapshot of the current contents, without saving.
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot::assemble(&self.registry, &self.loaded_title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn envelope(origin: ContextId, message: Message) -> Envelope {
        Envelope { origin, message }
    }

    fn coordinator_with_page(context: ContextId) -> SaveCoordinator {
        let mut coordinator = SaveCoordinator::new(context, "Notes");
        for component in [
            Component::new("title", "Notes"),
            Component::new("block-1", "one"),
            Component::new("block-2", "two"),
        ] {
            coordinator.handle(&envelope(context, Message::Register(component)));
        }
        coordinator
    }

    #[test]
    fn test_own_save_in_idle_issues_snapshot() {
        let context = ContextId::new();
        let mut coordinator = coordinator_with_page(context);

        let snapshot = coordinator
            .handle(&envelope(
                context,
                Message::Save(Some(Component::new("block-2", "TWO"))),
            ))
            .unwrap();

        assert_eq!(coordinator.state(), SaveState::Submitting);
        assert_eq!(snapshot.body, "one\nTWO");
        assert_eq!(snapshot.title, "Notes");
        assert_eq!(snapshot.old_title, "Notes");
    }

    #[test]
    fn test_save_while_submitting_is_dropped() {
        let context = ContextId::new();
        let mut coordinator = coordinator_with_page(context);

        assert!(coordinator.handle(&envelope(context, Message::Save(None))).is_some());
        let second = coordinator.handle(&envelope(
            context,
            Message::Save(Some(Component::new("block-1", "dropped"))),
        ));

        assert!(second.is_none());
        assert_eq!(coordinator.registry().get("block-1"), Some("one"));
    }

    #[test]
    fn test_failed_write_needs_reset() {
        let context = ContextId::new();
        let mut coordinator = coordinator_with_page(context);

        coordinator.handle(&envelope(context, Message::Save(None)));
        let saved = coordinator.finish_write(Err(WriteError::Interrupted("test".to_owned())));

        assert!(saved.is_none());
        assert_eq!(coordinator.state(), SaveState::Error);
        assert!(coordinator.handle(&envelope(context, Message::Save(None))).is_none());
        assert_eq!(coordinator.state(), SaveState::Error);

        assert!(coordinator.reset());
        assert_eq!(coordinator.state(), SaveState::Idle);
        assert!(coordinator.handle(&envelope(context, Message::Save(None))).is_some());
    }

    #[test]
    fn test_successful_write_tracks_new_title() {
        let context = ContextId::new();
        let mut coordinator = coordinator_with_page(context);

        coordinator.handle(&envelope(
            context,
            Message::Save(Some(Component::new("title", "Renamed"))),
        ));
        let saved = coordinator.finish_write(Ok(())).unwrap();

        assert_eq!(saved.old_title, "Notes");
        assert_eq!(saved.title, "Renamed");
        assert_eq!(coordinator.state(), SaveState::Idle);
        assert_eq!(coordinator.snapshot().old_title, "Renamed");
    }

    #[test]
    fn test_remote_save_merges_without_writing() {
        let context = ContextId::new();
        let mut coordinator = coordinator_with_page(context);

        let result = coordinator.handle(&envelope(
            ContextId::new(),
            Message::Save(Some(Component::new("block-1", "remote edit"))),
        ));

        assert!(result.is_none());
        assert_eq!(coordinator.state(), SaveState::Idle);
        assert_eq!(coordinator.registry().get("block-1"), Some("remote edit"));
    }

    #[test]
    fn test_unregister_does_not_register() {
        let context = ContextId::new();
        let mut coordinator = coordinator_with_page(context);

        coordinator.handle(&envelope(context, Message::Unregister("block-9".to_owned())));
        coordinator.handle(&envelope(context, Message::Unregister("block-1".to_owned())));

        assert_eq!(coordinator.registry().get("block-9"), None);
        assert_eq!(coordinator.registry().get("block-1"), None);
        assert_eq!(coordinator.registry().len(), 2);
    }

    #[test]
    fn test_complete_while_idle_is_ignored() {
        let mut coordinator = SaveCoordinator::new(ContextId::new(), "");
        assert!(coordinator.finish_write(Ok(())).is_none());
        assert!(!coordinator.reset());
        assert_eq!(coordinator.state(), SaveState::Idle);
    }
}
