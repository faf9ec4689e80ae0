//! In-process LSL-style streaming layer
//!
//! Players replay recordings as named, discoverable streams; readers attach
//! to them by source id and pull trailing windows out of a ring buffer.

pub mod buffer;
pub mod info;
pub mod inlet;
pub mod player;
pub mod recording;
pub mod registry;

pub use buffer::RingBuffer;
pub use info::{local_clock, Chunk, StreamInfo, Window};
pub use inlet::StreamReader;
pub use player::Player;
pub use recording::Recording;
pub use registry::{Outlet, StreamRegistry};
