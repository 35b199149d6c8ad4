//! Editing session lifecycle.
//!
//! A [`DocumentSession`] is one editing context on one document. Opening it
//! subscribes to the document's channel and spawns a coordinator task that
//! owns the context's registry and save state. All registry changes travel
//! over the channel, the sending context included, so every context on the
//! document applies the same messages in the same order.
//!
//! The task handles channel messages before local commands (`biased`
//! select), so a command observes every message published before it.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tendril_codec::{decode_html, encode_to_presentation};

use crate::channel::{ChannelHub, channel_name};
use crate::coordinator::SaveCoordinator;
use crate::error::{SessionError, WriteError};
use crate::machine::SaveState;
use crate::message::{Component, ContextId, Envelope, Message};
use crate::recent::RecentPages;
use crate::snapshot::DocumentSnapshot;
use crate::writer::PageWriter;

/// Collaborators and initial state for a session.
pub struct SessionOptions {
    /// Page title at load time, reported as `old_title` on the first save.
    pub loaded_title: String,
    /// Persistence sink.
    pub writer: Arc<dyn PageWriter>,
    /// MRU list told about every successful save.
    pub recent: Option<Arc<dyn RecentPages>>,
}

impl SessionOptions {
    /// Options with the given writer, an empty load-time title and no MRU list.
    #[must_use]
    pub fn new(writer: Arc<dyn PageWriter>) -> Self {
        Self {
            loaded_title: String::new(),
            writer,
            recent: None,
        }
    }

    /// Set the load-time title.
    #[must_use]
    pub fn with_loaded_title(mut self, title: impl Into<String>) -> Self {
        self.loaded_title = title.into();
        self
    }

    /// Set the MRU list.
    #[must_use]
    pub fn with_recent(mut self, recent: Arc<dyn RecentPages>) -> Self {
        self.recent = Some(recent);
        self
    }
}

enum Command {
    Reset,
    State(oneshot::Sender<SaveState>),
    Dump(oneshot::Sender<Vec<Component>>),
    Snapshot(oneshot::Sender<DocumentSnapshot>),
    Close,
}

/// One editing context on one document.
pub struct DocumentSession {
    context: ContextId,
    path: String,
    channel: String,
    hub: ChannelHub,
    commands: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<SaveState>,
    task: JoinHandle<()>,
}

impl DocumentSession {
    /// Open a session on `path` and start its coordinator task.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnsupportedEnvironment`] when called outside a
    /// Tokio runtime or when the hub cannot provide a channel.
    pub fn open(
        hub: &ChannelHub,
        path: &str,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let runtime = Handle::try_current()
            .map_err(|err| SessionError::UnsupportedEnvironment(err.to_string()))?;

        let channel = channel_name(path);
        let receiver = hub.subscribe(&channel)?;
        let context = ContextId::new();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SaveState::Idle);

        let driver = Driver {
            coordinator: SaveCoordinator::new(context, options.loaded_title),
            receiver,
            commands: command_rx,
            writer: options.writer,
            recent: options.recent,
            state: state_tx,
            channel: channel.clone(),
        };
        let task = runtime.spawn(driver.run());

        info!(%context, channel = %channel, "Opened document session");

        Ok(Self {
            context,
            path: path.to_owned(),
            channel,
            hub: hub.clone(),
            commands,
            state_rx,
            task,
        })
    }

    /// This context's id.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Document path the session was opened on.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of the document channel.
    #[must_use]
    pub fn channel_name(&self) -> &str {
        &self.channel
    }

    /// Mount or replace a component in every context on this document.
    pub fn register(&self, component: Component) -> Result<(), SessionError> {
        self.publish(Message::Register(component))
    }

    /// Unmount a component in every context on this document.
    pub fn unregister(&self, id: &str) -> Result<(), SessionError> {
        self.publish(Message::Unregister(id.to_owned()))
    }

    /// Request a save, optionally merging one changed component first.
    ///
    /// Only acted on while this context is [`SaveState::Idle`]; otherwise
    /// the request is dropped. Other contexts merge `partial` but do not
    /// write.
    pub fn save(&self, partial: Option<Component>) -> Result<(), SessionError> {
        self.publish(Message::Save(partial))
    }

    /// Decode an edited presentation fragment and save it as component `id`.
    pub fn save_presentation(&self, id: &str, html: &str) -> Result<(), SessionError> {
        let content = decode_html(html)?;
        self.save(Some(Component::new(id, content)))
    }

    /// Presentation form of one component, for display.
    pub async fn presentation(&self, id: &str) -> Result<Option<String>, SessionError> {
        let components = self.dump().await?;
        Ok(components
            .into_iter()
            .find(|component| component.id == id)
            .map(|component| encode_to_presentation(&component.content)))
    }

    /// Leave the error state.
    pub fn reset(&self) -> Result<(), SessionError> {
        self.commands
            .send(Command::Reset)
            .map_err(|_| SessionError::Closed)
    }

    /// Save state after every message published so far has been handled.
    pub async fn state(&self) -> Result<SaveState, SessionError> {
        self.request(Command::State).await
    }

    /// Wait until no write is in flight and return the resulting state.
    pub async fn settled(&self) -> Result<SaveState, SessionError> {
        let state = self.state().await?;
        if state != SaveState::Submitting {
            return Ok(state);
        }

        let mut watcher = self.state_rx.clone();
        let settled = watcher
            .wait_for(|state| *state != SaveState::Submitting)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(*settled)
    }

    /// Watch save state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SaveState> {
        self.state_rx.clone()
    }

    /// Registered components in registry order.
    pub async fn dump(&self) -> Result<Vec<Component>, SessionError> {
        self.request(Command::Dump).await
    }

    /// Snapshot of the current contents, without saving.
    pub async fn snapshot(&self) -> Result<DocumentSnapshot, SessionError> {
        self.request(Command::Snapshot).await
    }

    /// Stop the coordinator task and leave the document channel.
    ///
    /// A write in flight is allowed to finish first.
    pub async fn close(self) -> Result<(), SessionError> {
        // the task may already have stopped
        let _ = self.commands.send(Command::Close);
        let joined = self.task.await;
        self.hub.release(&self.channel);
        info!(context = %self.context, channel = %self.channel, "Closed document session");
        joined.map_err(|err| {
            warn!(error = %err, "Session task failed");
            SessionError::Closed
        })
    }

    fn publish(&self, message: Message) -> Result<(), SessionError> {
        self.hub.publish(
            &self.channel,
            Envelope {
                origin: self.context,
                message,
            },
        )
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }
}

/// Coordinator task state.
struct Driver {
    coordinator: SaveCoordinator,
    receiver: mpsc::UnboundedReceiver<Envelope>,
    commands: mpsc::UnboundedReceiver<Command>,
    writer: Arc<dyn PageWriter>,
    recent: Option<Arc<dyn RecentPages>>,
    state: watch::Sender<SaveState>,
    channel: String,
}

type PendingWrite = JoinHandle<Result<(), WriteError>>;

impl Driver {
    async fn run(mut self) {
        let mut pending: Option<PendingWrite> = None;

        loop {
            tokio::select! {
                biased;

                received = self.receiver.recv() => match received {
                    Some(envelope) => {
                        debug!(
                            channel = %self.channel,
                            origin = %envelope.origin,
                            message = ?envelope.message,
                            "Handling channel message"
                        );
                        if let Some(snapshot) = self.coordinator.handle(&envelope) {
                            pending = Some(self.spawn_write(snapshot));
                        }
                    }
                    None => break,
                },
                result = wait_write(&mut pending) => {
                    pending = None;
                    self.finish_write(result);
                }
                command = self.commands.recv() => {
                    if !self.apply(command) {
                        break;
                    }
                }
            }
            self.state.send_replace(self.coordinator.state());
        }

        if let Some(mut handle) = pending.take() {
            let result = join_write(&mut handle).await;
            self.finish_write(result);
            self.state.send_replace(self.coordinator.state());
        }
        debug!(
            channel = %self.channel,
            context = %self.coordinator.context(),
            "Session task stopped"
        );
    }

    /// Returns `false` when the task should stop.
    fn apply(&mut self, command: Option<Command>) -> bool {
        match command {
            Some(Command::Reset) => {
                self.coordinator.reset();
            }
            Some(Command::State(reply)) => {
                let _ = reply.send(self.coordinator.state());
            }
            Some(Command::Dump(reply)) => {
                let _ = reply.send(self.coordinator.registry().dump());
            }
            Some(Command::Snapshot(reply)) => {
                let _ = reply.send(self.coordinator.snapshot());
            }
            Some(Command::Close) | None => return false,
        }
        true
    }

    fn spawn_write(&self, snapshot: DocumentSnapshot) -> PendingWrite {
        info!(channel = %self.channel, title = %snapshot.title, "Submitting save");
        let writer = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || writer.write(&snapshot))
    }

    fn finish_write(&mut self, result: Result<(), WriteError>) {
        if let Some(saved) = self.coordinator.finish_write(result) {
            info!(channel = %self.channel, title = %saved.title, "Save complete");
            if let Some(recent) = &self.recent {
                recent.record(&saved.old_title, &saved.title);
            }
        }
    }
}

/// Resolve when the pending write finishes; never resolves without one.
async fn wait_write(pending: &mut Option<PendingWrite>) -> Result<(), WriteError> {
    match pending {
        Some(handle) => join_write(handle).await,
        None => std::future::pending().await,
    }
}

async fn join_write(handle: &mut PendingWrite) -> Result<(), WriteError> {
    handle
        .await
        .unwrap_or_else(|err| Err(WriteError::Interrupted(err.to_string())))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::mpsc as std_mpsc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::recent::RecentList;

    /// Records snapshots and answers each write with a fixed status.
    #[derive(Default)]
    struct RecordingWriter {
        reject_with: Option<u16>,
        writes: Mutex<Vec<DocumentSnapshot>>,
    }

    impl RecordingWriter {
        fn rejecting(status: u16) -> Self {
            Self {
                reject_with: Some(status),
                ..Self::default()
            }
        }

        fn writes(&self) -> Vec<DocumentSnapshot> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl PageWriter for RecordingWriter {
        fn write(&self, snapshot: &DocumentSnapshot) -> Result<(), WriteError> {
            self.writes.lock().unwrap().push(snapshot.clone());
            match self.reject_with {
                Some(status) => Err(WriteError::RejectedWrite {
                    status,
                    body: "rejected".to_owned(),
                }),
                None => Ok(()),
            }
        }
    }

    /// Blocks every write until the test releases it.
    struct GatedWriter {
        gate: Mutex<std_mpsc::Receiver<Result<(), WriteError>>>,
        writes: Mutex<Vec<DocumentSnapshot>>,
    }

    impl GatedWriter {
        fn new() -> (Arc<Self>, std_mpsc::Sender<Result<(), WriteError>>) {
            let (release, gate) = std_mpsc::channel();
            let writer = Arc::new(Self {
                gate: Mutex::new(gate),
                writes: Mutex::new(Vec::new()),
            });
            (writer, release)
        }
    }

    impl PageWriter for GatedWriter {
        fn write(&self, snapshot: &DocumentSnapshot) -> Result<(), WriteError> {
            self.writes.lock().unwrap().push(snapshot.clone());
            self.gate
                .lock()
                .unwrap()
                .recv()
                .unwrap_or_else(|_| Err(WriteError::Interrupted("gate dropped".to_owned())))
        }
    }

    fn open(hub: &ChannelHub, path: &str, writer: Arc<dyn PageWriter>) -> DocumentSession {
        DocumentSession::open(hub, path, SessionOptions::new(writer)).unwrap()
    }

    fn recording_options() -> SessionOptions {
        SessionOptions::new(Arc::new(RecordingWriter::default()))
    }

    fn ids(components: &[Component]) -> Vec<&str> {
        components.iter().map(|c| c.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_back_to_back_saves_issue_one_write() {
        let hub = ChannelHub::new();
        let (writer, release) = GatedWriter::new();
        let session = open(&hub, "notes", Arc::<GatedWriter>::clone(&writer));

        session.register(Component::new("block-1", "one")).unwrap();
        session.save(None).unwrap();
        session
            .save(Some(Component::new("block-1", "dropped")))
            .unwrap();

        assert_eq!(session.state().await.unwrap(), SaveState::Submitting);

        release.send(Ok(())).unwrap();
        assert_eq!(session.settled().await.unwrap(), SaveState::Idle);

        let writes = writer.writes.lock().unwrap().clone();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].body, "one");

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_writes_assembled_snapshot() {
        let hub = ChannelHub::new();
        let writer = Arc::new(RecordingWriter::default());
        let session = DocumentSession::open(
            &hub,
            "notes",
            SessionOptions::new(Arc::<RecordingWriter>::clone(&writer)).with_loaded_title("Notes"),
        )
        .unwrap();

        for component in [
            Component::new("title", "Notes"),
            Component::new("block-1", "one"),
            Component::new("block-2", "two"),
            Component::new("block-3", "three"),
            Component::new("block-2", "TWO"),
            Component::new("tags", "rust"),
        ] {
            session.register(component).unwrap();
        }
        session
            .save(Some(Component::new("block-3", "THREE")))
            .unwrap();

        assert_eq!(session.settled().await.unwrap(), SaveState::Idle);
        assert_eq!(
            writer.writes(),
            vec![DocumentSnapshot {
                body: "one\nTWO\nTHREE".to_owned(),
                title: "Notes".to_owned(),
                old_title: "Notes".to_owned(),
                tags: "rust".to_owned(),
                metadata: String::new(),
            }]
        );

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_write_waits_for_reset() {
        let hub = ChannelHub::new();
        let writer = Arc::new(RecordingWriter::rejecting(500));
        let session = open(&hub, "notes", Arc::<RecordingWriter>::clone(&writer));

        session.register(Component::new("block-1", "one")).unwrap();
        session.save(None).unwrap();
        assert_eq!(session.settled().await.unwrap(), SaveState::Error);

        session.save(None).unwrap();
        assert_eq!(session.state().await.unwrap(), SaveState::Error);
        assert_eq!(writer.writes().len(), 1);

        session.reset().unwrap();
        assert_eq!(session.state().await.unwrap(), SaveState::Idle);
        session.save(None).unwrap();
        assert_eq!(session.settled().await.unwrap(), SaveState::Error);
        assert_eq!(writer.writes().len(), 2);

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_registry_changes_reach_every_context_of_the_document() {
        let hub = ChannelHub::new();
        let writer: Arc<dyn PageWriter> = Arc::new(RecordingWriter::default());
        let first = open(&hub, "notes", Arc::clone(&writer));
        let second = open(&hub, "/notes/", Arc::clone(&writer));
        let other = open(&hub, "todo", Arc::clone(&writer));

        first.register(Component::new("block-1", "one")).unwrap();
        second.register(Component::new("block-2", "two")).unwrap();

        assert_eq!(ids(&first.dump().await.unwrap()), vec!["block-1", "block-2"]);
        assert_eq!(ids(&second.dump().await.unwrap()), vec!["block-1", "block-2"]);
        assert!(other.dump().await.unwrap().is_empty());

        first.unregister("block-1").unwrap();
        assert_eq!(ids(&second.dump().await.unwrap()), vec!["block-2"]);

        for session in [first, second, other] {
            session.close().await.unwrap();
        }
        assert_eq!(hub.topic_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_save_merges_without_writing() {
        let hub = ChannelHub::new();
        let first_writer = Arc::new(RecordingWriter::default());
        let second_writer = Arc::new(RecordingWriter::default());
        let first = open(&hub, "notes", Arc::<RecordingWriter>::clone(&first_writer));
        let second = open(&hub, "notes", Arc::<RecordingWriter>::clone(&second_writer));

        first.register(Component::new("block-1", "one")).unwrap();
        first
            .save(Some(Component::new("block-1", "edited")))
            .unwrap();

        assert_eq!(first.settled().await.unwrap(), SaveState::Idle);
        assert_eq!(second.state().await.unwrap(), SaveState::Idle);
        assert_eq!(
            second.dump().await.unwrap(),
            vec![Component::new("block-1", "edited")]
        );
        assert_eq!(first_writer.writes().len(), 1);
        assert!(second_writer.writes().is_empty());

        first.close().await.unwrap();
        second.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_presentation_decodes_markup() {
        let hub = ChannelHub::new();
        let writer = Arc::new(RecordingWriter::default());
        let session = open(&hub, "notes", Arc::<RecordingWriter>::clone(&writer));

        session.register(Component::new("block-1", "")).unwrap();
        session
            .save_presentation("block-1", r#"Meet <a href="/Home">Home</a><br>again"#)
            .unwrap();

        assert_eq!(session.settled().await.unwrap(), SaveState::Idle);
        assert_eq!(writer.writes()[0].body, "Meet [[Home]]\nagain");

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_presentation_encodes_component() {
        let hub = ChannelHub::new();
        let session = open(&hub, "notes", Arc::new(RecordingWriter::default()));

        session
            .register(Component::new("block-1", "see [[Home]]"))
            .unwrap();

        assert_eq!(
            session.presentation("block-1").await.unwrap().as_deref(),
            Some(r#"see <a href="/Home">Home</a>"#)
        );
        assert_eq!(session.presentation("block-9").await.unwrap(), None);

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_successful_saves_update_recent_pages() {
        let hub = ChannelHub::new();
        let recent = Arc::new(RecentList::new(5));
        let session = DocumentSession::open(
            &hub,
            "draft",
            SessionOptions::new(Arc::new(RecordingWriter::default()))
                .with_loaded_title("Draft")
                .with_recent(Arc::<RecentList>::clone(&recent)),
        )
        .unwrap();

        session.register(Component::new("title", "Draft")).unwrap();
        session.save(None).unwrap();
        assert_eq!(session.settled().await.unwrap(), SaveState::Idle);
        assert_eq!(recent.titles(), vec!["Draft"]);

        session
            .save(Some(Component::new("title", "Final")))
            .unwrap();
        assert_eq!(session.settled().await.unwrap(), SaveState::Idle);
        assert_eq!(recent.titles(), vec!["Final"]);
        assert_eq!(session.snapshot().await.unwrap().old_title, "Final");

        session.close().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_close_waits_for_write_in_flight() {
        let hub = ChannelHub::new();
        let (writer, release) = GatedWriter::new();
        let recent = Arc::new(RecentList::new(5));
        let session = DocumentSession::open(
            &hub,
            "notes",
            SessionOptions::new(Arc::<GatedWriter>::clone(&writer)).with_recent(Arc::<RecentList>::clone(&recent)),
        )
        .unwrap();

        session.register(Component::new("title", "Notes")).unwrap();
        session.save(None).unwrap();
        assert_eq!(session.state().await.unwrap(), SaveState::Submitting);

        release.send(Ok(())).unwrap();
        session.close().await.unwrap();

        assert_eq!(recent.titles(), vec!["Notes"]);
    }

    #[tokio::test]
    async fn test_shutdown_hub_closes_sessions() {
        let hub = ChannelHub::new();
        let session = open(&hub, "notes", Arc::new(RecordingWriter::default()));

        hub.shutdown();

        assert!(matches!(session.state().await, Err(SessionError::Closed)));
        assert!(matches!(
            session.register(Component::new("block-1", "")),
            Err(SessionError::Closed)
        ));
        assert!(matches!(
            DocumentSession::open(&hub, "notes", recording_options()),
            Err(SessionError::UnsupportedEnvironment(_))
        ));
    }

    #[tokio::test]
    async fn test_save_after_many_registrations_keeps_every_component() {
        let hub = ChannelHub::new();
        let writer = Arc::new(RecordingWriter::default());
        let session = open(&hub, "notes", Arc::<RecordingWriter>::clone(&writer));

        session.register(Component::new("title", "Long page")).unwrap();
        for n in 1..=500 {
            session
                .register(Component::new(format!("block-{n}"), format!("line {n}")))
                .unwrap();
        }
        session.save(None).unwrap();

        assert_eq!(session.settled().await.unwrap(), SaveState::Idle);
        let writes = writer.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].title, "Long page");
        let expected: Vec<String> = (1..=500).map(|n| format!("line {n}")).collect();
        assert_eq!(writes[0].body, expected.join("\n"));
        assert_eq!(session.dump().await.unwrap().len(), 501);

        session.close().await.unwrap();
    }

    #[test]
    fn test_open_outside_runtime_is_unsupported() {
        let hub = ChannelHub::new();
        let result = DocumentSession::open(&hub, "notes", recording_options());
        assert!(matches!(result, Err(SessionError::UnsupportedEnvironment(_))));
    }
}
