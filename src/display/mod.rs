//! Local display of relayed windows

#[cfg(feature = "plot")]
mod plot;

#[cfg(feature = "plot")]
pub use plot::{render_window_png, PlotDisplay};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::config::DisplayConfig;
use crate::lsl::info::Window;

/// Windows queued for the display before new ones are dropped
const DISPLAY_QUEUE: usize = 8;

/// Receives every window the relay sends, in send order
pub trait DisplaySink: Send {
    /// `window.data[i]` belongs to `channels[i]`
    fn update(&mut self, window: &Window, channels: &[String]);
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn update(&mut self, _window: &Window, _channels: &[String]) {}
}

/// Logs a line per window at debug level
#[derive(Debug, Default)]
pub struct LogDisplay {
    updates: u64,
}

impl LogDisplay {
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

impl DisplaySink for LogDisplay {
    fn update(&mut self, window: &Window, channels: &[String]) {
        self.updates += 1;
        tracing::debug!(
            update = self.updates,
            samples = window.n_samples(),
            first = ?window.first_timestamp(),
            last = ?window.last_timestamp(),
            channels = ?channels,
            "Window"
        );
    }
}

struct Frame {
    window: Window,
    channels: Vec<String>,
}

/// A sink running on its own blocking thread, fed over a bounded queue.
///
/// Rendering never runs on the caller's task; when the sink falls behind,
/// new windows are dropped rather than queued.
#[derive(Clone)]
pub struct DisplayHandle {
    frames: mpsc::Sender<Frame>,
}

impl DisplayHandle {
    /// Start the display thread. Must be called from within a tokio runtime.
    pub fn spawn(mut sink: Box<dyn DisplaySink>) -> Self {
        let (frames, mut rx) = mpsc::channel::<Frame>(DISPLAY_QUEUE);

        tokio::task::spawn_blocking(move || {
            while let Some(frame) = rx.blocking_recv() {
                sink.update(&frame.window, &frame.channels);
            }
            tracing::debug!("Display stopped");
        });

        Self { frames }
    }

    /// Queue a window for display without waiting on the sink
    pub fn show(&self, window: Window, channels: &[String]) {
        let frame = Frame {
            window,
            channels: channels.to_vec(),
        };
        match self.frames.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => tracing::trace!("Display behind, dropping window"),
            Err(TrySendError::Closed(_)) => tracing::warn!("Display thread has exited"),
        }
    }
}

/// Build the sink the configuration asks for
pub fn from_config(config: &DisplayConfig) -> Box<dyn DisplaySink> {
    if !config.enabled {
        return Box::new(NullDisplay);
    }

    #[cfg(feature = "plot")]
    {
        tracing::info!("Plotting windows to {}", config.output.display());
        Box::new(PlotDisplay::new(config.clone()))
    }

    #[cfg(not(feature = "plot"))]
    {
        tracing::warn!("Display enabled but built without the `plot` feature; logging windows instead");
        Box::new(LogDisplay::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[test]
    fn test_disabled_config_gives_null_sink() {
        let mut sink = from_config(&DisplayConfig::default());
        sink.update(&Window::default(), &[]);
    }

    #[test]
    fn test_log_display_counts() {
        let mut sink = LogDisplay::default();
        let window = Window {
            timestamps: vec![0.0, 0.1],
            data: vec![vec![1.0, 2.0]],
        };
        sink.update(&window, &["Cz".to_string()]);
        sink.update(&window, &["Cz".to_string()]);
        assert_eq!(sink.updates(), 2);
    }

    struct Slow {
        release: std::sync::mpsc::Receiver<()>,
        seen: Arc<AtomicUsize>,
    }

    impl DisplaySink for Slow {
        fn update(&mut self, _window: &Window, _channels: &[String]) {
            let _ = self.release.recv();
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn one_sample() -> Window {
        Window {
            timestamps: vec![0.0],
            data: vec![vec![1.0]],
        }
    }

    #[tokio::test]
    async fn test_slow_sink_does_not_block_show() {
        let (release, gate) = std::sync::mpsc::channel();
        let seen = Arc::new(AtomicUsize::new(0));
        let display = DisplayHandle::spawn(Box::new(Slow {
            release: gate,
            seen: seen.clone(),
        }));

        let started = Instant::now();
        for _ in 0..(DISPLAY_QUEUE * 4) {
            display.show(one_sample(), &["Cz".to_string()]);
        }
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        drop(release);
        drop(display);
        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let shown = seen.load(Ordering::SeqCst);
        assert!(shown >= 1);
        assert!(shown <= DISPLAY_QUEUE + 1);
    }

    #[tokio::test]
    async fn test_display_handle_delivers_in_order() {
        struct Recording(Arc<parking_lot::Mutex<Vec<f64>>>);

        impl DisplaySink for Recording {
            fn update(&mut self, window: &Window, _channels: &[String]) {
                self.0.lock().extend_from_slice(&window.timestamps);
            }
        }

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let display = DisplayHandle::spawn(Box::new(Recording(seen.clone())));
        for t in 0..3 {
            let window = Window {
                timestamps: vec![t as f64],
                data: vec![vec![0.0]],
            };
            display.show(window, &["Cz".to_string()]);
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.lock().len() < 3 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(*seen.lock(), vec![0.0, 1.0, 2.0]);
    }
}
