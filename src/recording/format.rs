//! Binary format definitions for WMR trial recordings.

use std::io::{self, Read, Write};

use crate::compute::TrialFrame;
use crate::schema::RobotParameters;

/// Magic bytes identifying a trial recording.
pub const RECORDING_MAGIC: &[u8; 4] = b"WMRT";

/// Current format version.
pub const RECORDING_VERSION: u16 = 1;

/// Compression type for frame data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CompressionType {
    /// No compression (raw f32 data).
    #[default]
    None = 0,
    /// LZ4 fast compression.
    Lz4 = 1,
}

impl CompressionType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Lz4),
            _ => None,
        }
    }

    /// Whether this build can read and write frames with this compression.
    pub fn is_supported(self) -> bool {
        match self {
            CompressionType::None => true,
            CompressionType::Lz4 => cfg!(feature = "lz4"),
        }
    }

    /// Error for a build that cannot handle this compression.
    pub(crate) fn ensure_supported(self) -> io::Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{:?} compression requires the `lz4` feature", self),
            ))
        }
    }
}

/// Recording header flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordingFlags {
    /// Compression type (lower 4 bits).
    pub compression: CompressionType,
}

impl RecordingFlags {
    pub fn to_u16(self) -> u16 {
        self.compression as u16
    }

    pub fn from_u16(v: u16) -> Self {
        Self {
            compression: CompressionType::from_u8((v & 0x0F) as u8).unwrap_or_default(),
        }
    }
}

/// Robot geometry stored alongside the frames so a player can draw them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RobotGeometry {
    pub wheel_radius: f32,
    pub chassis_length: f32,
    pub chassis_height: f32,
    pub sensor_limit: f32,
}

impl RobotGeometry {
    pub fn from_parameters(params: &RobotParameters) -> Self {
        Self {
            wheel_radius: params.wheel_radius as f32,
            chassis_length: params.chassis_length as f32,
            chassis_height: params.chassis_height() as f32,
            sensor_limit: params.sensor_limit as f32,
        }
    }
}

/// File header for trial recordings.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingHeader {
    /// Total number of frames.
    pub frame_count: u64,
    /// Simulated seconds between frames.
    pub frame_interval: f32,
    /// Scalar fields per frame.
    pub fields_per_frame: u32,
    pub geometry: RobotGeometry,
    pub flags: RecordingFlags,
}

impl RecordingHeader {
    /// Size of header in bytes.
    /// Magic(4) + Version(2) + Flags(2) + FrameCount(8) + FrameInterval(4) +
    /// Geometry(16) + FieldsPerFrame(4) + Reserved(8) = 48
    pub const SIZE: usize = 48;

    pub fn new(geometry: RobotGeometry, frame_interval: f32, flags: RecordingFlags) -> Self {
        Self {
            frame_count: 0,
            frame_interval,
            fields_per_frame: TrialFrame::FIELDS as u32,
            geometry,
            flags,
        }
    }

    /// Write header to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(RECORDING_MAGIC)?;
        w.write_all(&RECORDING_VERSION.to_le_bytes())?;
        w.write_all(&self.flags.to_u16().to_le_bytes())?;
        w.write_all(&self.frame_count.to_le_bytes())?;
        w.write_all(&self.frame_interval.to_le_bytes())?;
        w.write_all(&self.geometry.wheel_radius.to_le_bytes())?;
        w.write_all(&self.geometry.chassis_length.to_le_bytes())?;
        w.write_all(&self.geometry.chassis_height.to_le_bytes())?;
        w.write_all(&self.geometry.sensor_limit.to_le_bytes())?;
        w.write_all(&self.fields_per_frame.to_le_bytes())?;
        // Reserved bytes
        w.write_all(&[0u8; 8])?;
        Ok(())
    }

    /// Read header from input.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != RECORDING_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid WMRT magic bytes",
            ));
        }

        let mut buf2 = [0u8; 2];
        let mut buf4 = [0u8; 4];
        let mut buf8 = [0u8; 8];

        r.read_exact(&mut buf2)?;
        let version = u16::from_le_bytes(buf2);
        if version != RECORDING_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported WMRT version: {}", version),
            ));
        }

        r.read_exact(&mut buf2)?;
        let flags = RecordingFlags::from_u16(u16::from_le_bytes(buf2));

        r.read_exact(&mut buf8)?;
        let frame_count = u64::from_le_bytes(buf8);

        let mut read_f32 = |r: &mut R| -> io::Result<f32> {
            r.read_exact(&mut buf4)?;
            Ok(f32::from_le_bytes(buf4))
        };
        let frame_interval = read_f32(r)?;
        let geometry = RobotGeometry {
            wheel_radius: read_f32(r)?,
            chassis_length: read_f32(r)?,
            chassis_height: read_f32(r)?,
            sensor_limit: read_f32(r)?,
        };

        r.read_exact(&mut buf4)?;
        let fields_per_frame = u32::from_le_bytes(buf4);
        if fields_per_frame as usize != TrialFrame::FIELDS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Unexpected frame layout: {} fields (expected {})",
                    fields_per_frame,
                    TrialFrame::FIELDS
                ),
            ));
        }

        // Skip reserved bytes
        r.read_exact(&mut buf8)?;

        Ok(Self {
            frame_count,
            frame_interval,
            fields_per_frame,
            geometry,
            flags,
        })
    }
}

/// Index entry for a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIndex {
    /// Byte offset from start of file.
    pub offset: u64,
    /// Stored size in bytes (equals uncompressed if no compression).
    pub size: u64,
}

impl FrameIndex {
    /// Size of one index entry in bytes.
    pub const SIZE: usize = 16;

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.offset.to_le_bytes())?;
        w.write_all(&self.size.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut buf8 = [0u8; 8];

        r.read_exact(&mut buf8)?;
        let offset = u64::from_le_bytes(buf8);

        r.read_exact(&mut buf8)?;
        let size = u64::from_le_bytes(buf8);

        Ok(Self { offset, size })
    }
}

/// Encode a frame as little-endian f32 fields.
pub fn encode_frame(frame: &TrialFrame) -> Vec<u8> {
    frame
        .to_array()
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

/// Decode little-endian f32 fields into a frame.
pub fn decode_frame(bytes: &[u8]) -> io::Result<TrialFrame> {
    if bytes.len() != TrialFrame::FIELDS * 4 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Frame size mismatch: {} bytes vs {} fields",
                bytes.len(),
                TrialFrame::FIELDS
            ),
        ));
    }

    let mut values = [0.0f32; TrialFrame::FIELDS];
    for (v, b) in values.iter_mut().zip(bytes.chunks_exact(4)) {
        *v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    }
    Ok(TrialFrame::from_array(&values))
}

/// Compress data using LZ4.
#[cfg(feature = "lz4")]
pub fn compress_lz4(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

/// Decompress LZ4 data.
#[cfg(feature = "lz4")]
pub fn decompress_lz4(data: &[u8]) -> io::Result<Vec<u8>> {
    lz4_flex::decompress_size_prepended(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Without the `lz4` feature, recorders and players reject LZ4 files up
/// front; these only exist so the match arms compile.
#[cfg(not(feature = "lz4"))]
pub fn compress_lz4(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

#[cfg(not(feature = "lz4"))]
pub fn decompress_lz4(_data: &[u8]) -> io::Result<Vec<u8>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "LZ4 compression requires the `lz4` feature",
    ))
}
