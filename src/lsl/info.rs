//! Stream descriptors and sample containers

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Instant;

use crate::error::StreamError;

/// Seconds elapsed on the process-wide monotonic stream clock.
///
/// All players stamp their samples with this clock, so timestamps from
/// different streams in one process are directly comparable.
pub fn local_clock() -> f64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// Identity and layout of an advertised stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Human-readable stream name (what clients pick by)
    pub name: String,
    /// Content type, e.g. "EEG"
    pub stream_type: String,
    /// Unique source identifier
    pub source_id: String,
    /// Nominal sample rate in Hz
    pub sample_rate: f64,
    /// Channel labels; index is the data row
    pub channel_names: Vec<String>,
}

impl StreamInfo {
    /// Build a descriptor, rejecting empty or duplicated channel lists and
    /// non-positive sample rates.
    pub fn new(
        name: impl Into<String>,
        stream_type: impl Into<String>,
        source_id: impl Into<String>,
        sample_rate: f64,
        channel_names: Vec<String>,
    ) -> Result<Self, StreamError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(StreamError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if channel_names.is_empty() {
            return Err(StreamError::InvalidConfig("stream has no channels".into()));
        }
        let mut seen = HashSet::new();
        for name in &channel_names {
            if !seen.insert(name.as_str()) {
                return Err(StreamError::InvalidConfig(format!(
                    "duplicate channel name: {}",
                    name
                )));
            }
        }

        Ok(Self {
            name: name.into(),
            stream_type: stream_type.into(),
            source_id: source_id.into(),
            sample_rate,
            channel_names,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channel_names.len()
    }

    /// Row index of a channel
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channel_names.iter().position(|c| c == name)
    }

    /// Map channel names to row indices, failing on the first unknown name
    pub fn resolve_picks(&self, picks: &[String]) -> Result<Vec<usize>, StreamError> {
        picks
            .iter()
            .map(|p| {
                self.channel_index(p)
                    .ok_or_else(|| StreamError::UnknownChannel(p.clone()))
            })
            .collect()
    }
}

/// Block of samples pushed by an outlet
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// One timestamp per sample
    pub timestamps: Vec<f64>,
    /// Samples as `data[channel][sample]`
    pub data: Vec<Vec<f64>>,
}

impl Chunk {
    pub fn n_samples(&self) -> usize {
        self.timestamps.len()
    }

    pub fn n_channels(&self) -> usize {
        self.data.len()
    }

    /// Check that every row matches the timestamp count
    pub fn validate(&self, n_channels: usize) -> Result<(), StreamError> {
        if self.data.len() != n_channels {
            return Err(StreamError::InvalidConfig(format!(
                "chunk has {} channels, stream has {}",
                self.data.len(),
                n_channels
            )));
        }
        if let Some(row) = self.data.iter().find(|r| r.len() != self.timestamps.len()) {
            return Err(StreamError::InvalidConfig(format!(
                "chunk row has {} samples for {} timestamps",
                row.len(),
                self.timestamps.len()
            )));
        }
        Ok(())
    }
}

/// Result of one pull: timestamps plus `data[selected channel][sample]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Window {
    pub timestamps: Vec<f64>,
    pub data: Vec<Vec<f64>>,
}

impl Window {
    /// True when the pull produced no samples
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn n_samples(&self) -> usize {
        self.timestamps.len()
    }

    pub fn n_channels(&self) -> usize {
        self.data.len()
    }

    pub fn first_timestamp(&self) -> Option<f64> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.timestamps.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_stream_info_validation() {
        assert!(StreamInfo::new("S", "EEG", "id", 250.0, names(&["Fp1", "Fp2"])).is_ok());
        assert!(StreamInfo::new("S", "EEG", "id", 0.0, names(&["Fp1"])).is_err());
        assert!(StreamInfo::new("S", "EEG", "id", f64::NAN, names(&["Fp1"])).is_err());
        assert!(StreamInfo::new("S", "EEG", "id", 250.0, vec![]).is_err());
        assert!(StreamInfo::new("S", "EEG", "id", 250.0, names(&["Cz", "Cz"])).is_err());
    }

    #[test]
    fn test_resolve_picks_preserves_request_order() {
        let info = StreamInfo::new("S", "EEG", "id", 250.0, names(&["Fp1", "Fp2", "Cz"])).unwrap();
        assert_eq!(info.resolve_picks(&names(&["Cz", "Fp1"])).unwrap(), vec![2, 0]);

        match info.resolve_picks(&names(&["Fp1", "Oz"])) {
            Err(StreamError::UnknownChannel(name)) => assert_eq!(name, "Oz"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_chunk_validation() {
        let chunk = Chunk {
            timestamps: vec![0.0, 0.1],
            data: vec![vec![1.0, 2.0], vec![3.0]],
        };
        assert!(chunk.validate(2).is_err());
        assert!(chunk.validate(3).is_err());

        let chunk = Chunk {
            timestamps: vec![0.0, 0.1],
            data: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        };
        assert!(chunk.validate(2).is_ok());
    }

    #[test]
    fn test_local_clock_is_monotonic() {
        let a = local_clock();
        let b = local_clock();
        assert!(b >= a);
    }
}
