//! Windowed real-time relay
//!
//! One [`Relay`] is shared by the endpoint; every accepted connection runs
//! [`Relay::run_session`] to completion with its own [`Session`] and its own
//! reader. Sessions share nothing mutable except the optional display queue.

pub mod pull;
pub mod session;
pub mod source;
pub mod transport;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RelayConfig;
use crate::display::{DisplayHandle, DisplaySink};
use crate::error::{ProtocolError, SessionError};
use crate::protocol::ServerMessage;

pub use pull::WindowPolicy;
pub use session::{Phase, Session};
pub use source::{LocalDiscovery, StreamDiscovery, WindowedReader};
pub use transport::Transport;

/// How a session went
#[derive(Debug)]
pub struct SessionSummary {
    pub session_id: u64,
    /// Phase the session was in when it ended
    pub last_phase: Phase,
    pub windows_sent: u64,
    pub empty_pulls: u64,
    /// Why the session ended
    pub end: SessionError,
}

/// Relay configuration plus the discovery all sessions draw from
pub struct Relay<D: StreamDiscovery> {
    discovery: Arc<D>,
    config: Arc<RelayConfig>,
    display: Option<DisplayHandle>,
    next_session_id: AtomicU64,
}

impl<D: StreamDiscovery> Relay<D> {
    pub fn new(discovery: D, config: RelayConfig) -> Self {
        Self {
            discovery: Arc::new(discovery),
            config: Arc::new(config),
            display: None,
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Feed relayed windows to a local display as well.
    ///
    /// The sink runs on its own thread, so this must be called from within
    /// a tokio runtime.
    pub fn with_display(mut self, display: Box<dyn DisplaySink>) -> Self {
        self.display = Some(DisplayHandle::spawn(display));
        self
    }

    pub fn discovery(&self) -> &D {
        &self.discovery
    }

    /// Run one client session from discovery to close.
    ///
    /// Never fails: every error ends the session, user-visible ones are sent
    /// to the client first, and the reader is always released.
    pub async fn run_session<T: Transport>(&self, mut transport: T) -> SessionSummary {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let mut session = Session::new(session_id);
        let mut reader: Option<D::Reader> = None;
        let mut counters = Counters::default();

        tracing::info!(session_id, "Session started");

        let end = match self
            .drive(&mut session, &mut transport, &mut reader, &mut counters)
            .await
        {
            Ok(never) => match never {},
            Err(e) => e,
        };
        let last_phase = session.phase();

        if let Some(text) = end.client_message() {
            tracing::warn!(session_id, phase = ?last_phase, reason = %end, "Negotiation failed");
            if let Err(e) = transport.send(&ServerMessage::error(text)).await {
                tracing::debug!(session_id, error = %e, "Could not deliver error message");
            }
        } else {
            match &end {
                SessionError::Disconnected => {
                    tracing::debug!(session_id, phase = ?last_phase, "Client disconnected")
                }
                other => {
                    tracing::error!(session_id, phase = ?last_phase, error = %other, "Session aborted")
                }
            }
        }

        if let Some(mut reader) = reader.take() {
            reader.disconnect();
        }
        session.close();
        transport.close().await;

        tracing::info!(
            session_id,
            windows_sent = counters.windows_sent,
            empty_pulls = counters.empty_pulls,
            "Session closed"
        );

        SessionSummary {
            session_id,
            last_phase,
            windows_sent: counters.windows_sent,
            empty_pulls: counters.empty_pulls,
            end,
        }
    }

    /// Negotiate, then stream until something ends the session
    async fn drive<T: Transport>(
        &self,
        session: &mut Session,
        transport: &mut T,
        reader: &mut Option<D::Reader>,
        counters: &mut Counters,
    ) -> Result<std::convert::Infallible, SessionError> {
        let offer = session.offer_streams(self.discovery.resolve_streams())?;
        transport.send(&offer).await?;

        let text = self
            .next_message(transport)
            .await?
            .map_err(|e| SessionError::InvalidStreamName(e.to_string()))?;
        let chosen = session.choose_stream(&text)?;

        let connected = self
            .discovery
            .connect(&chosen, self.config.buffer_seconds)
            .map_err(|e| {
                tracing::error!(session_id = session.id(), stream = %chosen.name, error = %e, "Stream connect failed");
                SessionError::ConnectFailed(e)
            })?;
        let channels = session.stream_connected(connected.info().clone());
        let reader = reader.insert(connected);
        transport.send(&channels).await?;

        let text = self
            .next_message(transport)
            .await?
            .map_err(|_| SessionError::InvalidChannelSelection(Vec::new()))?;
        session.choose_channels(&text)?;

        tracing::info!(
            session_id = session.id(),
            stream = %chosen.name,
            channels = ?session.channels(),
            policy = ?self.config.window,
            "Streaming"
        );

        self.stream(session, transport, reader, counters).await
    }

    /// Pull, send, pause; forever, until the client goes away
    async fn stream<T: Transport>(
        &self,
        session: &Session,
        transport: &mut T,
        reader: &mut D::Reader,
        counters: &mut Counters,
    ) -> Result<std::convert::Infallible, SessionError> {
        let sample_rate = reader.info().sample_rate;

        loop {
            let (window, winsize) = match self.config.window {
                WindowPolicy::Fixed { seconds } => {
                    (reader.get_data(Some(seconds), session.channels())?, Some(seconds))
                }
                // Count and read the unread tail under one lock so no sample
                // lands between sizing and pulling
                WindowPolicy::Adaptive => {
                    let window = reader.take_unread(session.channels())?;
                    let winsize = self.config.window.window_size(window.n_samples(), sample_rate);
                    (window, winsize)
                }
            };

            if window.is_empty() {
                counters.empty_pulls += 1;
                tracing::debug!(session_id = session.id(), "No new data, skipping tick");
            } else {
                let shown = self.display.as_ref().map(|display| (display, window.clone()));

                let included = if self.config.include_winsize { winsize } else { None };
                transport.send(&session.data_message(window, included)).await?;
                counters.windows_sent += 1;

                if let Some((display, window)) = shown {
                    display.show(window, session.channels());
                }
            }

            self.pause(transport, self.config.poll_interval()).await?;
        }
    }

    /// Wait for the next negotiation message, honoring the handshake timeout
    async fn next_message<T: Transport>(
        &self,
        transport: &mut T,
    ) -> Result<Result<String, ProtocolError>, SessionError> {
        let inbound = match self.config.handshake_timeout() {
            Some(limit) => tokio::time::timeout(limit, transport.recv())
                .await
                .map_err(|_| SessionError::HandshakeTimeout)?,
            None => transport.recv().await,
        };
        inbound.ok_or(SessionError::Disconnected)
    }

    /// Sleep for the poll interval while watching for a disconnect.
    ///
    /// Frames received after the handshake are ignored.
    async fn pause<T: Transport>(&self, transport: &mut T, interval: Duration) -> Result<(), SessionError> {
        let sleep = tokio::time::sleep(interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                inbound = transport.recv() => match inbound {
                    None => return Err(SessionError::Disconnected),
                    Some(_) => tracing::debug!("Ignoring message received while streaming"),
                },
            }
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    windows_sent: u64,
    empty_pulls: u64,
}
