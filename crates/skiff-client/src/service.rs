//! Remote command execution over long-polled output.
//!
//! Starting a command returns the location of its first output chunk. Every
//! fetch of a chunk either carries data plus a `Location` for the next one,
//! carries nothing yet (retry the same location after [`EMPTY_CHUNK_BACKOFF`]),
//! or carries the last of the output without a `Location`.

use std::fmt;
use std::time::Duration;

use futures::Stream;
use reqwest::StatusCode;

use crate::client::{segment, Client};
use crate::error::{ClientError, ClientResult};
use crate::transport::{Payload, Response};

/// Pause before re-polling a chunk location that had no output yet.
pub const EMPTY_CHUNK_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub app: String,
    pub command: String,
    pub attached: bool,
}

/// What one chunk fetch told us about the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    NoData,
    More { next: String, chunk: String },
    Final(String),
}

pub fn classify_chunk(response: Response) -> ChunkOutcome {
    let next = response.location().map(str::to_owned);
    if next.is_none() && response.status != StatusCode::NO_CONTENT {
        return ChunkOutcome::Final(response.body);
    }
    match next {
        Some(next) if !response.is_no_content() => ChunkOutcome::More {
            next,
            chunk: response.body,
        },
        _ => ChunkOutcome::NoData,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputChunk {
    pub text: String,
    pub continuation: Option<String>,
}

impl OutputChunk {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Process lifecycle actions accepted by the service endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Bounce,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Bounce => "bounce",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses a long-running process (`upid`) of an application.
#[derive(Clone)]
pub struct ProcessHandle {
    client: Client,
    app: String,
    upid: String,
}

impl ProcessHandle {
    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn upid(&self) -> &str {
        &self.upid
    }

    pub async fn transition(&self, action: Action) -> ClientResult<()> {
        let path = format!(
            "/apps/{}/services/{}",
            segment(&self.app),
            segment(&self.upid)
        );
        tracing::debug!(
            target: "skiff::service",
            app = %self.app,
            upid = %self.upid,
            %action,
            "transitioning process"
        );
        self.client
            .put(path, Payload::text(action.as_str()))
            .await
            .map_err(ClientError::classify_crash)?;
        Ok(())
    }

    pub async fn up(&self) -> ClientResult<()> {
        self.transition(Action::Up).await
    }

    pub async fn down(&self) -> ClientResult<()> {
        self.transition(Action::Down).await
    }

    pub async fn bounce(&self) -> ClientResult<()> {
        self.transition(Action::Bounce).await
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("app", &self.app)
            .field("upid", &self.upid)
            .finish()
    }
}

/// Output of one remote command, fetched chunk by chunk.
///
/// A session is active while it holds a chunk location and exhausted once a
/// final chunk was read; it never becomes active again.
pub struct StreamingSession {
    client: Client,
    command: RemoteCommand,
    process: Option<ProcessHandle>,
    next_chunk: Option<String>,
    poll_interval: Duration,
}

impl StreamingSession {
    pub fn command(&self) -> &RemoteCommand {
        &self.command
    }

    pub fn attached(&self) -> bool {
        self.command.attached
    }

    /// Process started for this command, when the platform reported its id.
    pub fn process(&self) -> Option<&ProcessHandle> {
        self.process.as_ref()
    }

    /// Sends `action` to this command's process. Output polling is unaffected.
    pub async fn transition(&self, action: Action) -> ClientResult<()> {
        let process = self.process.as_ref().ok_or_else(|| {
            ClientError::InvalidResponse(format!(
                "platform reported no process id for `{}`",
                self.command.command
            ))
        })?;
        process.transition(action).await
    }

    pub fn next_chunk_pointer(&self) -> Option<&str> {
        self.next_chunk.as_deref()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn end_of_stream(&self) -> bool {
        self.next_chunk.is_none()
    }

    /// Fetches the chunk at the current location and advances the session.
    pub async fn read(&mut self) -> ClientResult<OutputChunk> {
        let pointer = self.next_chunk.clone().ok_or(ClientError::StreamExhausted)?;
        let response = match self.client.get(pointer.as_str()).await {
            Ok(response) => response,
            // The last poll of a stream sometimes comes back as a 422 whose
            // body holds the trailing output.
            Err(ClientError::RequestFailed { status, body })
                if status == StatusCode::UNPROCESSABLE_ENTITY =>
            {
                tracing::debug!(
                    target: "skiff::service",
                    app = %self.command.app,
                    "treating 422 chunk response as final output"
                );
                Response::new(status, body)
            }
            Err(err) => return Err(err),
        };

        let outcome = classify_chunk(response);
        tracing::trace!(target: "skiff::service", location = %pointer, ?outcome, "chunk fetched");
        Ok(self.advance(outcome))
    }

    fn advance(&mut self, outcome: ChunkOutcome) -> OutputChunk {
        match outcome {
            ChunkOutcome::NoData => {
                self.poll_interval = EMPTY_CHUNK_BACKOFF;
                OutputChunk {
                    text: String::new(),
                    continuation: self.next_chunk.clone(),
                }
            }
            ChunkOutcome::More { next, chunk } => {
                self.next_chunk = Some(next.clone());
                self.poll_interval = Duration::ZERO;
                OutputChunk {
                    text: chunk,
                    continuation: Some(next),
                }
            }
            ChunkOutcome::Final(chunk) => {
                self.next_chunk = None;
                OutputChunk {
                    text: chunk,
                    continuation: None,
                }
            }
        }
    }

    /// Polls until the stream ends, handing every non-empty chunk to
    /// `callback` in arrival order.
    pub async fn for_each<F>(&mut self, mut callback: F) -> ClientResult<()>
    where
        F: FnMut(&str),
    {
        while !self.end_of_stream() {
            self.pace().await;
            let chunk = self.read().await?;
            if !chunk.is_empty() {
                callback(&chunk.text);
            }
        }
        Ok(())
    }

    pub async fn collect_all(&mut self) -> ClientResult<String> {
        let mut output = String::new();
        self.for_each(|chunk| output.push_str(chunk)).await?;
        Ok(output)
    }

    /// Non-empty chunks as a stream, paced the same way as [`Self::for_each`].
    /// The stream ends after the final chunk or the first error.
    pub fn into_stream(self) -> impl Stream<Item = ClientResult<String>> {
        futures::stream::unfold(Some(self), |state| async move {
            let Some(mut session) = state else {
                return None;
            };
            loop {
                if session.end_of_stream() {
                    return None;
                }
                session.pace().await;
                match session.read().await {
                    Ok(chunk) if chunk.is_empty() => continue,
                    Ok(chunk) => return Some((Ok(chunk.into_text()), Some(session))),
                    Err(err) => return Some((Err(err), None)),
                }
            }
        })
    }

    async fn pace(&self) {
        if !self.poll_interval.is_zero() {
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingSession")
            .field("command", &self.command)
            .field("process", &self.process)
            .field("next_chunk", &self.next_chunk)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl Client {
    /// Starts `command` on `app`. The response body is the location of the
    /// first output chunk; an empty body yields an already exhausted session.
    pub async fn start_service(
        &self,
        app: &str,
        command: &str,
        attached: bool,
    ) -> ClientResult<StreamingSession> {
        let path = format!("/apps/{}/services", segment(app));
        tracing::debug!(target: "skiff::service", app, command, attached, "starting command");
        let response = self
            .post(path, Payload::text(command))
            .await
            .map_err(ClientError::classify_crash)?;

        let process = response.upid().map(|upid| self.process(app, upid));
        let pointer = response.body.trim();
        Ok(StreamingSession {
            client: self.clone(),
            command: RemoteCommand {
                app: app.to_string(),
                command: command.to_string(),
                attached,
            },
            process,
            next_chunk: (!pointer.is_empty()).then(|| pointer.to_string()),
            poll_interval: Duration::ZERO,
        })
    }

    /// Runs `command` attached and returns its complete output.
    pub async fn run_sync(&self, app: &str, command: &str) -> ClientResult<String> {
        let mut session = self.start_service(app, command, true).await?;
        session.collect_all().await
    }

    pub fn process(&self, app: &str, upid: &str) -> ProcessHandle {
        ProcessHandle {
            client: self.clone(),
            app: app.to_string(),
            upid: upid.to_string(),
        }
    }
}
