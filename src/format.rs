//! .vec binary file format
//!
//! # File Structure
//!
//! ```text
//! Offset   Size    Type        Description
//! ─────────────────────────────────────────────
//! 0x00     8       [u8; 8]     Magic: "ARXVEC01"
//! 0x08     4       u32 LE      N: Number of vectors
//! 0x0C     4       u32 LE      D: Dimension
//! 0x10     N*D*4   [f32]       Vector data (Little Endian)
//! ```
//!
//! The header is self-describing: dimension and count are recoverable from
//! the file alone. Floats round-trip exactly through their LE byte encoding.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

/// Magic bytes identifying a .vec file: "ARXVEC01"
pub const MAGIC: [u8; 8] = *b"ARXVEC01";

/// Header size in bytes: 8 (magic) + 4 (count) + 4 (dim) = 16
pub const HEADER_SIZE: usize = 16;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("invalid magic bytes: expected ARXVEC01")]
    InvalidMagic,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("file truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Parsed .vec file header
#[derive(Debug, Clone, Copy)]
pub struct VecHeader {
    pub count: u32,
    pub dimension: u32,
}

impl VecHeader {
    /// Parse header from the first 16 bytes of a file
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::Truncated {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        if bytes[0..8] != MAGIC {
            return Err(FormatError::InvalidMagic);
        }

        let count = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let dimension = u32::from_le_bytes(bytes[12..16].try_into().unwrap());

        Ok(Self { count, dimension })
    }

    /// Serialize the header to bytes
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&MAGIC);
        buf[8..12].copy_from_slice(&self.count.to_le_bytes());
        buf[12..16].copy_from_slice(&self.dimension.to_le_bytes());
        buf
    }

    /// Byte offset of the vector at `index`
    #[inline(always)]
    pub fn offset(&self, index: usize) -> usize {
        HEADER_SIZE + index * self.dimension as usize * std::mem::size_of::<f32>()
    }

    /// Total file size implied by the header
    pub fn file_size(&self) -> usize {
        HEADER_SIZE
            + self.count as usize * self.dimension as usize * std::mem::size_of::<f32>()
    }
}

/// Writer for creating .vec files
///
/// Writes a placeholder header up front, streams vectors, then back-patches
/// the count and syncs in [`finish`](VecWriter::finish). A file is not valid
/// until `finish` returns.
pub struct VecWriter {
    writer: BufWriter<File>,
    dimension: usize,
    count: u32,
}

impl VecWriter {
    /// Create a new .vec file writer
    pub fn create<P: AsRef<Path>>(path: P, dimension: usize) -> Result<Self, FormatError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = VecHeader {
            count: 0,
            dimension: dimension as u32,
        };
        writer.write_all(&header.to_bytes())?;

        Ok(Self {
            writer,
            dimension,
            count: 0,
        })
    }

    /// Append a single vector
    pub fn write_vector(&mut self, vector: &[f32]) -> Result<(), FormatError> {
        if vector.len() != self.dimension {
            return Err(FormatError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        for &val in vector {
            self.writer.write_all(&val.to_le_bytes())?;
        }

        self.count += 1;
        Ok(())
    }

    /// Finalize the file, patching the header with the actual count
    pub fn finish(mut self) -> Result<u32, FormatError> {
        use std::io::Seek;

        self.writer.flush()?;

        let file = self.writer.get_mut();
        file.seek(io::SeekFrom::Start(8))?;
        file.write_all(&self.count.to_le_bytes())?;
        file.sync_all()?;

        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_header_roundtrip() {
        let header = VecHeader {
            count: 2_000,
            dimension: 384,
        };
        let parsed = VecHeader::from_bytes(&header.to_bytes()).unwrap();

        assert_eq!(parsed.count, 2_000);
        assert_eq!(parsed.dimension, 384);
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        let mut bytes = VecHeader {
            count: 1,
            dimension: 2,
        }
        .to_bytes();
        bytes[0] = b'X';

        assert!(matches!(
            VecHeader::from_bytes(&bytes),
            Err(FormatError::InvalidMagic)
        ));
    }

    #[test]
    fn test_header_rejects_short_input() {
        assert!(matches!(
            VecHeader::from_bytes(&[0u8; 7]),
            Err(FormatError::Truncated { .. })
        ));
    }

    #[test]
    fn test_offset_calculation() {
        let header = VecHeader {
            count: 100,
            dimension: 384,
        };

        assert_eq!(header.offset(0), 16);
        assert_eq!(header.offset(1), 16 + 384 * 4);
        assert_eq!(header.offset(10), 16 + 10 * 384 * 4);
        assert_eq!(header.file_size(), 16 + 100 * 384 * 4);
    }

    #[test]
    fn test_writer_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.vec");

        let mut writer = VecWriter::create(&path, 4).unwrap();
        writer.write_vector(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        writer.write_vector(&[5.0, 6.0, 7.0, 8.0]).unwrap();
        let count = writer.finish().unwrap();

        assert_eq!(count, 2);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..8], b"ARXVEC01");
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 4);
        assert_eq!(bytes.len(), 16 + 2 * 4 * 4);
    }

    #[test]
    fn test_writer_dimension_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.vec");

        let mut writer = VecWriter::create(&path, 4).unwrap();
        let result = writer.write_vector(&[1.0, 2.0, 3.0]);

        assert!(matches!(
            result,
            Err(FormatError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }
}
