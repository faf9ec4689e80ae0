//! In-process stream registry
//!
//! Plays the role of the LSL resolver: outlets advertise a [`StreamInfo`],
//! readers resolve and attach to them by source id.

use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};

use crate::error::StreamError;
use crate::lsl::buffer::{RingBuffer, SharedRingBuffer};
use crate::lsl::info::{Chunk, StreamInfo};

struct OutletShared {
    info: StreamInfo,
    readers: RwLock<Vec<Weak<Mutex<RingBuffer>>>>,
}

/// Cloneable handle to the set of advertised streams
#[derive(Clone, Default)]
pub struct StreamRegistry {
    outlets: Arc<RwLock<Vec<Arc<OutletShared>>>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise a stream. The source id must not already be in use.
    pub fn advertise(&self, info: StreamInfo) -> Result<Outlet, StreamError> {
        let mut outlets = self.outlets.write();
        if outlets.iter().any(|o| o.info.source_id == info.source_id) {
            return Err(StreamError::InvalidConfig(format!(
                "source id already advertised: {}",
                info.source_id
            )));
        }

        tracing::debug!(
            stream = %info.name,
            source_id = %info.source_id,
            channels = info.channel_count(),
            sample_rate = info.sample_rate,
            "Advertising stream"
        );

        let shared = Arc::new(OutletShared {
            info,
            readers: RwLock::new(Vec::new()),
        });
        outlets.push(shared.clone());

        Ok(Outlet {
            shared,
            registry: self.clone(),
        })
    }

    /// All advertised streams, in advertisement order
    pub fn resolve_streams(&self) -> Vec<StreamInfo> {
        self.outlets.read().iter().map(|o| o.info.clone()).collect()
    }

    /// Look up one stream by source id
    pub fn find(&self, source_id: &str) -> Option<StreamInfo> {
        self.outlets
            .read()
            .iter()
            .find(|o| o.info.source_id == source_id)
            .map(|o| o.info.clone())
    }

    /// Stop advertising a stream. Returns false if it was not advertised.
    pub fn withdraw(&self, source_id: &str) -> bool {
        let mut outlets = self.outlets.write();
        let before = outlets.len();
        outlets.retain(|o| o.info.source_id != source_id);
        before != outlets.len()
    }

    /// Attach a reader buffer to a stream
    pub(crate) fn attach(
        &self,
        source_id: &str,
        buffer: &SharedRingBuffer,
    ) -> Result<StreamInfo, StreamError> {
        let outlets = self.outlets.read();
        let outlet = outlets
            .iter()
            .find(|o| o.info.source_id == source_id)
            .ok_or_else(|| StreamError::StreamNotFound(source_id.to_string()))?;

        outlet.readers.write().push(Arc::downgrade(buffer));
        Ok(outlet.info.clone())
    }

    /// Detach a reader buffer; a no-op if the stream is gone
    pub(crate) fn detach(&self, source_id: &str, buffer: &SharedRingBuffer) {
        let outlets = self.outlets.read();
        if let Some(outlet) = outlets.iter().find(|o| o.info.source_id == source_id) {
            outlet.readers.write().retain(|weak| match weak.upgrade() {
                Some(existing) => !Arc::ptr_eq(&existing, buffer),
                None => false,
            });
        }
    }
}

/// Producer side of an advertised stream; withdrawn from the registry on drop
pub struct Outlet {
    shared: Arc<OutletShared>,
    registry: StreamRegistry,
}

impl Outlet {
    pub fn info(&self) -> &StreamInfo {
        &self.shared.info
    }

    /// Fan a chunk out to every attached reader.
    ///
    /// Returns the number of readers that received it.
    pub fn push_chunk(&self, chunk: &Chunk) -> Result<usize, StreamError> {
        chunk.validate(self.shared.info.channel_count())?;

        let mut delivered = 0;
        let mut readers = self.shared.readers.write();
        readers.retain(|weak| match weak.upgrade() {
            Some(buffer) => {
                buffer.lock().push_chunk(chunk);
                delivered += 1;
                true
            }
            None => false,
        });

        Ok(delivered)
    }

    /// Number of readers currently attached
    pub fn reader_count(&self) -> usize {
        self.shared
            .readers
            .read()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

impl Drop for Outlet {
    fn drop(&mut self) {
        if self.registry.withdraw(&self.shared.info.source_id) {
            tracing::debug!(source_id = %self.shared.info.source_id, "Stream withdrawn");
        }
    }
}
