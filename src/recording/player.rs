//! Recording player for reading back trial frames.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::format::{
    CompressionType, FrameIndex, RecordingHeader, RobotGeometry, decode_frame, decompress_lz4,
};
use crate::compute::TrialFrame;

/// Reads `.wmrt` trial recordings.
///
/// Usage:
/// ```ignore
/// let mut player = RecordingPlayer::open("best.wmrt")?;
/// println!("Recording has {} frames", player.frame_count());
///
/// let frame = player.read_frame(10)?;
///
/// for frame in player.frames() {
///     let frame = frame?;
/// }
/// ```
pub struct RecordingPlayer {
    reader: BufReader<File>,
    header: RecordingHeader,
    frame_indices: Vec<FrameIndex>,
}

impl RecordingPlayer {
    /// Open a recording for playback.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let header = RecordingHeader::read_from(&mut reader)?;
        header.flags.compression.ensure_supported()?;

        // Index table sits at the end of the file.
        let file_len = reader.seek(SeekFrom::End(0))?;
        let table_size = header.frame_count.checked_mul(FrameIndex::SIZE as u64);
        let index_start = table_size
            .and_then(|size| file_len.checked_sub(size))
            .filter(|&start| start >= RecordingHeader::SIZE as u64)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Truncated recording: {} bytes cannot hold {} frames",
                        file_len, header.frame_count
                    ),
                )
            })?;

        reader.seek(SeekFrom::Start(index_start))?;

        // Bounded by the file length checked above.
        let mut frame_indices = Vec::with_capacity(header.frame_count as usize);
        for _ in 0..header.frame_count {
            frame_indices.push(FrameIndex::read_from(&mut reader)?);
        }

        Ok(Self {
            reader,
            header,
            frame_indices,
        })
    }

    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }

    /// Get total number of frames.
    pub fn frame_count(&self) -> u64 {
        self.header.frame_count
    }

    pub fn geometry(&self) -> RobotGeometry {
        self.header.geometry
    }

    /// Simulated seconds between frames.
    pub fn frame_interval(&self) -> f32 {
        self.header.frame_interval
    }

    /// Read a specific frame by index.
    pub fn read_frame(&mut self, frame_index: u64) -> io::Result<TrialFrame> {
        let Some(index) = self.frame_indices.get(frame_index as usize).copied() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Frame index {} out of range ({} frames)",
                    frame_index, self.header.frame_count
                ),
            ));
        };

        self.reader.seek(SeekFrom::Start(index.offset))?;
        let mut data = vec![0u8; index.size as usize];
        self.reader.read_exact(&mut data)?;

        let raw = match self.header.flags.compression {
            CompressionType::None => data,
            CompressionType::Lz4 => decompress_lz4(&data)?,
        };

        decode_frame(&raw)
    }

    /// Create an iterator over all frames.
    pub fn frames(&mut self) -> FrameIterator<'_> {
        FrameIterator {
            player: self,
            current: 0,
        }
    }
}

/// Iterator over recorded frames.
pub struct FrameIterator<'a> {
    player: &'a mut RecordingPlayer,
    current: u64,
}

impl Iterator for FrameIterator<'_> {
    type Item = io::Result<TrialFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.player.frame_count() {
            return None;
        }

        let result = self.player.read_frame(self.current);
        self.current += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.player.frame_count() - self.current) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameIterator<'_> {}
