//! Trial recorder for capturing playback frames.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use super::format::{
    CompressionType, FrameIndex, RecordingFlags, RecordingHeader, RobotGeometry, compress_lz4,
    encode_frame,
};
use crate::compute::{TrialFrame, TrialTrace};
use crate::schema::{RobotParameters, SimulationSettings};

/// Configuration for trial recording.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Compression type to use.
    pub compression: CompressionType,
    /// Record every Nth frame (1 = every frame).
    pub frame_skip: u32,
    /// Maximum frames to record (0 = unlimited).
    pub max_frames: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            compression: CompressionType::None,
            frame_skip: 1,
            max_frames: 0,
        }
    }
}

/// Writes trial frames to a `.wmrt` file.
///
/// Usage:
/// ```ignore
/// let mut recorder = TrialRecorder::new("best.wmrt", &params, 0.1, Default::default())?;
/// for frame in &trace.frames {
///     recorder.record_frame(frame)?;
/// }
/// recorder.finalize()?;
/// ```
pub struct TrialRecorder {
    writer: BufWriter<File>,
    header: RecordingHeader,
    frame_indices: Vec<FrameIndex>,
    config: RecorderConfig,
    frames_written: u64,
    step_counter: u32,
}

impl TrialRecorder {
    /// Create a new recorder for a robot design.
    pub fn new<P: AsRef<Path>>(
        path: P,
        params: &RobotParameters,
        frame_interval: f64,
        config: RecorderConfig,
    ) -> io::Result<Self> {
        config.compression.ensure_supported()?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = RecordingHeader::new(
            RobotGeometry::from_parameters(params),
            frame_interval as f32 * config.frame_skip.max(1) as f32,
            RecordingFlags {
                compression: config.compression,
            },
        );

        // Placeholder; frame count is patched on finalize.
        header.write_to(&mut writer)?;

        Ok(Self {
            writer,
            header,
            frame_indices: Vec::new(),
            config,
            frames_written: 0,
            step_counter: 0,
        })
    }

    /// Record a frame.
    ///
    /// Returns true if the frame was actually written (may skip frames based on config).
    pub fn record_frame(&mut self, frame: &TrialFrame) -> io::Result<bool> {
        self.step_counter += 1;

        if self.step_counter < self.config.frame_skip {
            return Ok(false);
        }
        self.step_counter = 0;

        if self.config.max_frames > 0 && self.frames_written >= self.config.max_frames {
            return Ok(false);
        }

        let offset = self.writer.stream_position()?;
        let raw = encode_frame(frame);
        let data = match self.header.flags.compression {
            CompressionType::None => raw,
            CompressionType::Lz4 => compress_lz4(&raw),
        };

        self.writer.write_all(&data)?;
        self.frame_indices.push(FrameIndex {
            offset,
            size: data.len() as u64,
        });
        self.frames_written += 1;

        Ok(true)
    }

    /// Finalize the recording.
    ///
    /// Writes the frame index table and patches the header frame count.
    pub fn finalize(mut self) -> io::Result<RecordingStats> {
        let index_offset = self.writer.stream_position()?;
        for index in &self.frame_indices {
            index.write_to(&mut self.writer)?;
        }

        self.header.frame_count = self.frames_written;
        self.writer.seek(SeekFrom::Start(0))?;
        self.header.write_to(&mut self.writer)?;
        self.writer.flush()?;

        let total_bytes = index_offset + self.frame_indices.len() as u64 * FrameIndex::SIZE as u64;

        Ok(RecordingStats {
            frame_count: self.frames_written,
            total_bytes,
            average_frame_size: if self.frames_written > 0 {
                index_offset.saturating_sub(RecordingHeader::SIZE as u64) / self.frames_written
            } else {
                0
            },
            compression: self.header.flags.compression,
        })
    }

    /// Get number of frames recorded so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

/// Write every frame of a recorded trace to `path`.
pub fn record_trace<P: AsRef<Path>>(
    path: P,
    params: &RobotParameters,
    settings: &SimulationSettings,
    trace: &TrialTrace,
    config: RecorderConfig,
) -> io::Result<RecordingStats> {
    let mut recorder = TrialRecorder::new(path, params, settings.frame_interval, config)?;
    for frame in &trace.frames {
        recorder.record_frame(frame)?;
    }
    recorder.finalize()
}

/// Statistics from a recording session.
#[derive(Debug, Clone)]
pub struct RecordingStats {
    /// Total frames recorded.
    pub frame_count: u64,
    /// Total file size in bytes.
    pub total_bytes: u64,
    /// Average stored frame size.
    pub average_frame_size: u64,
    /// Compression used.
    pub compression: CompressionType,
}

impl std::fmt::Display for RecordingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} bytes total, {} bytes/frame avg ({:?} compression)",
            self.frame_count, self.total_bytes, self.average_frame_size, self.compression
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn frame(t: f32) -> TrialFrame {
        TrialFrame {
            time: t,
            chassis_x: 3.0 + t,
            ..Default::default()
        }
    }

    #[test]
    fn test_recorder_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wmrt");

        let mut recorder = TrialRecorder::new(
            &path,
            &RobotParameters::default(),
            0.1,
            RecorderConfig::default(),
        )
        .unwrap();

        for i in 0..10 {
            recorder.record_frame(&frame(i as f32 * 0.1)).unwrap();
        }

        let stats = recorder.finalize().unwrap();
        assert_eq!(stats.frame_count, 10);
        assert_eq!(stats.average_frame_size, (TrialFrame::FIELDS * 4) as u64);

        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(metadata.len(), stats.total_bytes);
    }

    #[test]
    fn test_recorder_frame_skip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("skip.wmrt");

        let config = RecorderConfig {
            frame_skip: 5,
            ..Default::default()
        };
        let mut recorder =
            TrialRecorder::new(&path, &RobotParameters::default(), 0.1, config).unwrap();

        // 20 frames offered, every 5th kept.
        for i in 0..20 {
            recorder.record_frame(&frame(i as f32)).unwrap();
        }

        let stats = recorder.finalize().unwrap();
        assert_eq!(stats.frame_count, 4);
    }

    #[test]
    fn test_recorder_max_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("max.wmrt");

        let config = RecorderConfig {
            max_frames: 5,
            ..Default::default()
        };
        let mut recorder =
            TrialRecorder::new(&path, &RobotParameters::default(), 0.1, config).unwrap();

        for i in 0..100 {
            recorder.record_frame(&frame(i as f32)).unwrap();
        }

        let stats = recorder.finalize().unwrap();
        assert_eq!(stats.frame_count, 5);
    }

    #[test]
    fn test_record_trace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trace.wmrt");

        let trace = TrialTrace {
            samples: Vec::new(),
            frames: (0..7).map(|i| frame(i as f32 * 0.1)).collect(),
        };
        let stats = record_trace(
            &path,
            &RobotParameters::default(),
            &SimulationSettings::default(),
            &trace,
            RecorderConfig::default(),
        )
        .unwrap();
        assert_eq!(stats.frame_count, 7);
    }

    #[test]
    fn test_lz4_only_with_feature() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lz4.wmrt");

        let config = RecorderConfig {
            compression: CompressionType::Lz4,
            ..Default::default()
        };
        let result = TrialRecorder::new(&path, &RobotParameters::default(), 0.1, config);
        assert_eq!(result.is_ok(), cfg!(feature = "lz4"));
        if let Err(err) = result {
            assert_eq!(err.kind(), io::ErrorKind::Unsupported);
            assert!(!path.exists());
        }
    }
}
