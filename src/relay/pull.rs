//! Window sizing policies for the streaming phase

use serde::{Deserialize, Serialize};

/// How much history to request on each pull
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Always request the same trailing duration; consecutive windows may overlap
    Fixed { seconds: f64 },
    /// Request only the samples that arrived since the previous pull
    Adaptive,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        WindowPolicy::Fixed { seconds: 2.0 }
    }
}

impl WindowPolicy {
    /// Window duration in seconds for the next pull.
    ///
    /// `None` means there is nothing to pull this tick.
    pub fn window_size(&self, n_new_samples: usize, sample_rate: f64) -> Option<f64> {
        match *self {
            WindowPolicy::Fixed { seconds } => Some(seconds),
            WindowPolicy::Adaptive if n_new_samples == 0 => None,
            WindowPolicy::Adaptive => Some(n_new_samples as f64 / sample_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_ignores_new_samples() {
        let policy = WindowPolicy::Fixed { seconds: 1.5 };
        assert_eq!(policy.window_size(0, 250.0), Some(1.5));
        assert_eq!(policy.window_size(1000, 250.0), Some(1.5));
    }

    #[test]
    fn test_adaptive_tracks_unread_tail() {
        let policy = WindowPolicy::Adaptive;
        assert_eq!(policy.window_size(0, 250.0), None);
        assert_eq!(policy.window_size(25, 250.0), Some(0.1));
    }

    #[test]
    fn test_serde_shape() {
        let fixed: WindowPolicy = toml::from_str("policy = \"fixed\"\nseconds = 1.0").unwrap();
        assert_eq!(fixed, WindowPolicy::Fixed { seconds: 1.0 });

        let adaptive: WindowPolicy = toml::from_str("policy = \"adaptive\"").unwrap();
        assert_eq!(adaptive, WindowPolicy::Adaptive);
    }
}
