//! Per-connection negotiation state
//!
//! ```text
//! Discovering ──streams──▶ AwaitingStreamChoice ──connected──▶ AwaitingChannelChoice
//!      │                          │                                   │
//!      └──────── error ───────────┴──────────── error ────────────────┤
//!                                                                     ▼
//!                         Closed ◀──── disconnect ──── Streaming ◀── valid
//! ```

use std::collections::HashSet;

use crate::error::SessionError;
use crate::lsl::info::{StreamInfo, Window};
use crate::protocol::{parse_client, ChannelChoice, DataWindow, ServerMessage, StreamChoice};

/// Negotiation phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Discovering,
    AwaitingStreamChoice,
    AwaitingChannelChoice,
    Streaming,
    Closed,
}

/// State of one client session
#[derive(Debug)]
pub struct Session {
    id: u64,
    phase: Phase,
    /// Streams offered in the last stream list
    offered: Vec<StreamInfo>,
    stream: Option<StreamInfo>,
    channels: Vec<String>,
}

impl Session {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            phase: Phase::Discovering,
            offered: Vec::new(),
            stream: None,
            channels: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Channels selected for streaming, in client order
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Offer discovered streams. An empty list ends the session.
    pub fn offer_streams(&mut self, streams: Vec<StreamInfo>) -> Result<ServerMessage, SessionError> {
        debug_assert_eq!(self.phase, Phase::Discovering);

        if streams.is_empty() {
            return Err(SessionError::NoStreams);
        }

        let message = ServerMessage::stream_list(&streams);
        self.offered = streams;
        self.phase = Phase::AwaitingStreamChoice;
        Ok(message)
    }

    /// Validate the client's stream choice against the offered list
    pub fn choose_stream(&mut self, text: &str) -> Result<StreamInfo, SessionError> {
        debug_assert_eq!(self.phase, Phase::AwaitingStreamChoice);

        let choice: StreamChoice = parse_client(text).map_err(|e| {
            tracing::warn!(session_id = self.id, error = %e, "Malformed stream choice");
            SessionError::InvalidStreamName(text.to_string())
        })?;

        self.offered
            .iter()
            .find(|s| s.name == choice.stream_name)
            .cloned()
            .ok_or(SessionError::InvalidStreamName(choice.stream_name))
    }

    /// Record the connected stream and produce its channel list
    pub fn stream_connected(&mut self, info: StreamInfo) -> ServerMessage {
        debug_assert_eq!(self.phase, Phase::AwaitingStreamChoice);

        let message = ServerMessage::channel_list(&info);
        self.stream = Some(info);
        self.phase = Phase::AwaitingChannelChoice;
        message
    }

    /// Validate the client's channel choice; a valid one starts streaming
    pub fn choose_channels(&mut self, text: &str) -> Result<&[String], SessionError> {
        debug_assert_eq!(self.phase, Phase::AwaitingChannelChoice);

        let choice: ChannelChoice = parse_client(text).map_err(|e| {
            tracing::warn!(session_id = self.id, error = %e, "Malformed channel choice");
            SessionError::InvalidChannelSelection(Vec::new())
        })?;

        let available: HashSet<&str> = self
            .stream
            .iter()
            .flat_map(|s| s.channel_names.iter().map(String::as_str))
            .collect();

        let selected = choice.selected_channels;
        if selected.is_empty() || !selected.iter().all(|c| available.contains(c.as_str())) {
            return Err(SessionError::InvalidChannelSelection(selected));
        }

        self.channels = selected;
        self.phase = Phase::Streaming;
        Ok(&self.channels)
    }

    /// Wrap a pulled window for sending
    pub fn data_message(&self, window: Window, winsize: Option<f64>) -> ServerMessage {
        ServerMessage::DataWindow(DataWindow::new(window, self.channels.clone(), winsize))
    }

    pub fn close(&mut self) {
        self.phase = Phase::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim_eeg() -> StreamInfo {
        StreamInfo::new(
            "SimEEG",
            "EEG",
            "sim",
            250.0,
            ["Fp1", "Fp2", "Cz", "O1", "O2", "Pz"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap()
    }

    fn streaming_ready() -> Session {
        let mut session = Session::new(1);
        session.offer_streams(vec![sim_eeg()]).unwrap();
        let info = session.choose_stream(r#"{"stream_name":"SimEEG"}"#).unwrap();
        session.stream_connected(info);
        session
    }

    #[test]
    fn test_no_streams() {
        let mut session = Session::new(1);
        assert!(matches!(session.offer_streams(vec![]), Err(SessionError::NoStreams)));
        assert_eq!(session.phase(), Phase::Discovering);
    }

    #[test]
    fn test_full_handshake() {
        let mut session = Session::new(7);

        let offer = session.offer_streams(vec![sim_eeg()]).unwrap();
        assert_eq!(offer, ServerMessage::StreamList { streams: vec!["SimEEG".into()] });
        assert_eq!(session.phase(), Phase::AwaitingStreamChoice);

        let info = session.choose_stream(r#"{"stream_name":"SimEEG"}"#).unwrap();
        let channels = session.stream_connected(info);
        match channels {
            ServerMessage::ChannelList { channels } => assert_eq!(channels.len(), 6),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(session.phase(), Phase::AwaitingChannelChoice);

        let selected = session
            .choose_channels(r#"{"selected_channels":["Fp1","Cz"]}"#)
            .unwrap();
        assert_eq!(selected, ["Fp1", "Cz"]);
        assert_eq!(session.phase(), Phase::Streaming);
    }

    #[test]
    fn test_unknown_stream_name() {
        let mut session = Session::new(1);
        session.offer_streams(vec![sim_eeg()]).unwrap();
        assert!(matches!(
            session.choose_stream(r#"{"stream_name":"Other"}"#),
            Err(SessionError::InvalidStreamName(name)) if name == "Other"
        ));
    }

    #[test]
    fn test_malformed_stream_choice() {
        let mut session = Session::new(1);
        session.offer_streams(vec![sim_eeg()]).unwrap();
        assert!(matches!(
            session.choose_stream("not json"),
            Err(SessionError::InvalidStreamName(_))
        ));
    }

    #[test]
    fn test_invalid_channel_selection() {
        let mut session = streaming_ready();
        assert!(matches!(
            session.choose_channels(r#"{"selected_channels":["Fp1","NotAChannel"]}"#),
            Err(SessionError::InvalidChannelSelection(_))
        ));
        assert_eq!(session.phase(), Phase::AwaitingChannelChoice);

        let mut session = streaming_ready();
        assert!(session.choose_channels(r#"{"selected_channels":[]}"#).is_err());

        let mut session = streaming_ready();
        assert!(session.choose_channels(r#"{"channels":["Fp1"]}"#).is_err());
    }

    #[test]
    fn test_data_message_carries_selection() {
        let mut session = streaming_ready();
        session
            .choose_channels(r#"{"selected_channels":["O2","Fp2"]}"#)
            .unwrap();

        let window = Window {
            timestamps: vec![0.0, 0.004],
            data: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        };
        match session.data_message(window, Some(0.008)) {
            ServerMessage::DataWindow(data) => {
                assert_eq!(data.selected_channels, vec!["O2", "Fp2"]);
                assert_eq!(data.winsize, Some(0.008));
                assert!(data.is_well_formed());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
