//! Persistence write of a document snapshot.

use std::time::Duration;

use tracing::info;
use ureq::Agent;

use crate::error::WriteError;
use crate::snapshot::DocumentSnapshot;

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Sink for saved documents.
///
/// Called from the blocking pool, once per accepted save.
pub trait PageWriter: Send + Sync {
    /// Persist one snapshot.
    fn write(&self, snapshot: &DocumentSnapshot) -> Result<(), WriteError>;
}

/// Writes snapshots to the wiki server's edit endpoint.
///
/// Sends `PUT {base_url}{edit_path}` with the snapshot as JSON. Any status
/// >= 400 is a rejected write.
pub struct HttpPageWriter {
    agent: Agent,
    endpoint: String,
}

impl HttpPageWriter {
    /// Create a writer with the default timeout.
    #[must_use]
    pub fn new(base_url: &str, edit_path: &str) -> Self {
        Self::with_timeout(base_url, edit_path, Duration::from_secs(DEFAULT_TIMEOUT))
    }

    /// Create a writer with an explicit request timeout.
    #[must_use]
    pub fn with_timeout(base_url: &str, edit_path: &str, timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            endpoint: format!("{}{edit_path}", base_url.trim_end_matches('/')),
        }
    }

    /// Full URL written to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PageWriter for HttpPageWriter {
    fn write(&self, snapshot: &DocumentSnapshot) -> Result<(), WriteError> {
        info!(endpoint = %self.endpoint, title = %snapshot.title, "Writing page");

        let response = self
            .agent
            .put(&self.endpoint)
            .header("Accept", "application/json")
            .send_json(snapshot)?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response
                .into_body()
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_owned());
            return Err(WriteError::RejectedWrite { status, body });
        }

        info!(status, title = %snapshot.title, "Page written");
        Ok(())
    }
}
