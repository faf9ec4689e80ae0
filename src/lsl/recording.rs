//! Recorded multi-channel time series used as playback material

use rand::Rng;
use std::collections::HashSet;
use std::f64::consts::PI;
use std::io::Read;
use std::path::Path;

use crate::error::StreamError;

/// A finite recording: `data[channel][sample]` at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub sample_rate: f64,
    pub channel_names: Vec<String>,
    pub data: Vec<Vec<f64>>,
}

impl Recording {
    /// Build a recording, checking that it is non-empty and rectangular
    pub fn new(
        sample_rate: f64,
        channel_names: Vec<String>,
        data: Vec<Vec<f64>>,
    ) -> Result<Self, StreamError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(StreamError::InvalidRecording(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if channel_names.is_empty() {
            return Err(StreamError::InvalidRecording("no channels".into()));
        }
        let unique: HashSet<_> = channel_names.iter().collect();
        if unique.len() != channel_names.len() {
            return Err(StreamError::InvalidRecording(
                "channel names must be unique".into(),
            ));
        }
        if data.len() != channel_names.len() {
            return Err(StreamError::InvalidRecording(format!(
                "{} channel names for {} data rows",
                channel_names.len(),
                data.len()
            )));
        }
        let n_samples = data[0].len();
        if n_samples == 0 {
            return Err(StreamError::InvalidRecording("no samples".into()));
        }
        if data.iter().any(|row| row.len() != n_samples) {
            return Err(StreamError::InvalidRecording(
                "channels have different lengths".into(),
            ));
        }

        Ok(Self {
            sample_rate,
            channel_names,
            data,
        })
    }

    /// Load a CSV recording: a header row of channel names, then one row
    /// per sample.
    pub fn from_csv(path: impl AsRef<Path>, sample_rate: f64) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let recording = Self::from_reader(file, sample_rate)?;

        tracing::info!(
            path = %path.display(),
            channels = recording.n_channels(),
            samples = recording.n_samples(),
            duration_secs = recording.duration_secs(),
            "Loaded recording"
        );

        Ok(recording)
    }

    /// Parse CSV from any reader
    pub fn from_reader<R: Read>(reader: R, sample_rate: f64) -> Result<Self, StreamError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let channel_names: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let mut data = vec![Vec::new(); channel_names.len()];

        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            for (channel, field) in data.iter_mut().zip(record.iter()) {
                let value = field.parse::<f64>().map_err(|e| {
                    StreamError::InvalidRecording(format!(
                        "row {}: {:?} is not a number ({})",
                        line + 1,
                        field,
                        e
                    ))
                })?;
                channel.push(value);
            }
        }

        Self::new(sample_rate, channel_names, data)
    }

    /// Synthesize an EEG-like recording: alpha and beta rhythms with a
    /// per-channel phase offset plus uniform noise, in microvolts.
    pub fn synthetic(channel_names: Vec<String>, sample_rate: f64, seconds: f64) -> Result<Self, StreamError> {
        let n_samples = (seconds * sample_rate).round().max(1.0) as usize;
        let mut rng = rand::thread_rng();

        let data = (0..channel_names.len())
            .map(|c| {
                let phase = c as f64 * PI / 6.0;
                let alpha = 10.0 + c as f64 * 0.5;
                (0..n_samples)
                    .map(|i| {
                        let t = i as f64 / sample_rate;
                        20.0 * (2.0 * PI * alpha * t + phase).sin()
                            + 5.0 * (2.0 * PI * 22.0 * t).sin()
                            + rng.gen_range(-3.0..3.0)
                    })
                    .collect()
            })
            .collect();

        Self::new(sample_rate, channel_names, data)
    }

    pub fn n_channels(&self) -> usize {
        self.channel_names.len()
    }

    pub fn n_samples(&self) -> usize {
        self.data.first().map(|row| row.len()).unwrap_or(0)
    }

    pub fn duration_secs(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate
    }

    /// Copy `n` samples starting at `start`, wrapping around the end
    pub fn slice_looped(&self, start: usize, n: usize) -> Vec<Vec<f64>> {
        let len = self.n_samples();
        self.data
            .iter()
            .map(|row| (0..n).map(|i| row[(start + i) % len]).collect())
            .collect()
    }
}
