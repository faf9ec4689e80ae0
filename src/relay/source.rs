//! Seams between the relay loop and the stream layer

use crate::error::StreamError;
use crate::lsl::info::{StreamInfo, Window};
use crate::lsl::inlet::StreamReader;
use crate::lsl::registry::StreamRegistry;

/// A connected reader that can answer "latest window of these channels"
pub trait WindowedReader: Send {
    fn info(&self) -> &StreamInfo;

    /// Pull the newest `winsize` seconds (all buffered samples for `None`)
    fn get_data(&mut self, winsize: Option<f64>, picks: &[String]) -> Result<Window, StreamError>;

    /// Pull exactly the samples that arrived since the previous pull
    fn take_unread(&mut self, picks: &[String]) -> Result<Window, StreamError>;

    /// Release the connection
    fn disconnect(&mut self);
}

/// Stream discovery plus connection factory, shared by every session
pub trait StreamDiscovery: Send + Sync + 'static {
    type Reader: WindowedReader;

    /// Streams currently advertised
    fn resolve_streams(&self) -> Vec<StreamInfo>;

    /// Open a fresh reader for one session
    fn connect(&self, info: &StreamInfo, bufsize: f64) -> Result<Self::Reader, StreamError>;
}

impl WindowedReader for StreamReader {
    fn info(&self) -> &StreamInfo {
        StreamReader::info(self)
    }

    fn get_data(&mut self, winsize: Option<f64>, picks: &[String]) -> Result<Window, StreamError> {
        StreamReader::get_data(self, winsize, picks)
    }

    fn take_unread(&mut self, picks: &[String]) -> Result<Window, StreamError> {
        StreamReader::take_unread(self, picks)
    }

    fn disconnect(&mut self) {
        StreamReader::disconnect(self)
    }
}

/// Discovery backed by the in-process registry
#[derive(Clone, Default)]
pub struct LocalDiscovery {
    registry: StreamRegistry,
}

impl LocalDiscovery {
    pub fn new(registry: StreamRegistry) -> Self {
        Self { registry }
    }
}

impl StreamDiscovery for LocalDiscovery {
    type Reader = StreamReader;

    fn resolve_streams(&self) -> Vec<StreamInfo> {
        self.registry.resolve_streams()
    }

    fn connect(&self, info: &StreamInfo, bufsize: f64) -> Result<StreamReader, StreamError> {
        StreamReader::connect(&self.registry, &info.source_id, bufsize)
    }
}
