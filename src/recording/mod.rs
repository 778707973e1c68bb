//! Trial recording and playback.
//!
//! A recorded trial lets the best design of a run be replayed without
//! re-simulating it.
//!
//! # File Format
//!
//! The `.wmrt` (WMR Trial) format stores playback frames with optional
//! compression:
//!
//! ```text
//! Header (48 bytes):
//!   Magic: "WMRT" (4 bytes)
//!   Version: u16
//!   Flags: u16 (compression)
//!   Frame count: u64
//!   Frame interval: f32
//!   Wheel radius, chassis length, chassis height, sensor limit: 4 x f32
//!   Fields per frame: u32
//!   Reserved: 8 bytes
//!
//! Frame data (variable):
//!   Each frame is fields_per_frame * 4 bytes (f32), optionally LZ4 compressed
//!
//! Frame index table (frame_count * 16 bytes, at end of file):
//!   Offset: u64
//!   Stored size: u64
//! ```

mod format;
mod player;
mod recorder;

pub use format::{
    CompressionType, FrameIndex, RECORDING_MAGIC, RECORDING_VERSION, RecordingFlags,
    RecordingHeader, RobotGeometry,
};
pub use player::{FrameIterator, RecordingPlayer};
pub use recorder::{RecorderConfig, RecordingStats, TrialRecorder, record_trace};
