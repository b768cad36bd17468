// src/compression/mod.rs
//! Compression detection for repository archives
//!
//! Files databases are usually gzip compressed, but repo-add can produce
//! bzip2, xz, zstd or lz4 as well, and nothing stops a mirror from serving
//! a plain tar.
//! The format is therefore sniffed from the stream's magic bytes rather
//! than trusted from a file name.

use std::io::{self, BufRead, Read};
use thiserror::Error;

/// Compression-related errors
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Failed to create {format} decoder: {source}")]
    DecoderCreation {
        format: &'static str,
        source: io::Error,
    },

    #[error("Failed to read stream header: {0}")]
    Peek(#[source] io::Error),
}

/// Supported compression formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// No compression (raw data)
    None,
    /// Gzip compression (.gz)
    Gzip,
    /// Bzip2 compression (.bz2)
    Bzip2,
    /// XZ/LZMA compression (.xz)
    Xz,
    /// Zstandard compression (.zst)
    Zstd,
    /// LZ4 frame format (.lz4)
    Lz4,
}

impl CompressionFormat {
    /// Detect compression format from magic bytes
    ///
    /// Magic bytes:
    /// - Gzip: `1f 8b`
    /// - Bzip2: `42 5a 68` ("BZh") followed by a block size digit
    /// - XZ: `fd 37 7a 58 5a 00` (FD + "7zXZ" + NUL)
    /// - Zstd: `28 b5 2f fd`
    /// - LZ4: `04 22 4d 18`
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(&[0x1f, 0x8b]) {
            Self::Gzip
        } else if data.starts_with(b"BZh") && matches!(data.get(3), Some(b'1'..=b'9')) {
            Self::Bzip2
        } else if data.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
            Self::Xz
        } else if data.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
            Self::Zstd
        } else if data.starts_with(&[0x04, 0x22, 0x4d, 0x18]) {
            Self::Lz4
        } else {
            Self::None
        }
    }

    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
            Self::Lz4 => "lz4",
        }
    }
}

impl std::fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Create a decompressing reader for the given format
///
/// For `CompressionFormat::None`, returns the reader unchanged.
pub fn create_decoder<'a, R: BufRead + 'a>(
    reader: R,
    format: CompressionFormat,
) -> Result<Box<dyn Read + 'a>, CompressionError> {
    match format {
        CompressionFormat::None => Ok(Box::new(reader)),
        CompressionFormat::Gzip => Ok(Box::new(flate2::bufread::MultiGzDecoder::new(reader))),
        CompressionFormat::Bzip2 => Ok(Box::new(bzip2::bufread::MultiBzDecoder::new(reader))),
        CompressionFormat::Xz => Ok(Box::new(xz2::bufread::XzDecoder::new(reader))),
        CompressionFormat::Zstd => {
            let decoder = zstd::Decoder::with_buffer(reader).map_err(|e| {
                CompressionError::DecoderCreation {
                    format: "zstd",
                    source: e,
                }
            })?;
            Ok(Box::new(decoder))
        }
        CompressionFormat::Lz4 => Ok(Box::new(lz4_flex::frame::FrameDecoder::new(reader))),
    }
}

/// Peek at the head of `reader` and wrap it in the matching decoder
///
/// Nothing is consumed by the detection, so the decoder sees the whole stream.
pub fn open_decoder<'a, R: BufRead + 'a>(
    mut reader: R,
) -> Result<(CompressionFormat, Box<dyn Read + 'a>), CompressionError> {
    let format = CompressionFormat::from_magic_bytes(
        reader.fill_buf().map_err(CompressionError::Peek)?,
    );
    Ok((format, create_decoder(reader, format)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PAYLOAD: &[u8] = b"%FILES%\nusr/\nusr/bin/\nusr/bin/bash\n";

    fn roundtrip(compressed: Vec<u8>, expected: CompressionFormat) {
        let (format, mut decoder) = open_decoder(compressed.as_slice()).unwrap();
        assert_eq!(format, expected);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, PAYLOAD);
    }

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            CompressionFormat::from_magic_bytes(&[0x1f, 0x8b, 0x08, 0x00]),
            CompressionFormat::Gzip
        );
        assert_eq!(
            CompressionFormat::from_magic_bytes(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]),
            CompressionFormat::Xz
        );
        assert_eq!(
            CompressionFormat::from_magic_bytes(&[0x28, 0xb5, 0x2f, 0xfd]),
            CompressionFormat::Zstd
        );
        assert_eq!(
            CompressionFormat::from_magic_bytes(b"BZh91AY&SY"),
            CompressionFormat::Bzip2
        );
        assert_eq!(
            CompressionFormat::from_magic_bytes(&[0x04, 0x22, 0x4d, 0x18, 0x64]),
            CompressionFormat::Lz4
        );
        // "BZh" without a block size is just text
        assert_eq!(CompressionFormat::from_magic_bytes(b"BZh/"), CompressionFormat::None);
        assert_eq!(
            CompressionFormat::from_magic_bytes(b"usr/\0\0\0"),
            CompressionFormat::None
        );
        // Too short for any magic
        assert_eq!(CompressionFormat::from_magic_bytes(&[0x1f]), CompressionFormat::None);
    }

    #[test]
    fn test_format_display() {
        assert_eq!(format!("{}", CompressionFormat::Gzip), "gzip");
        assert_eq!(format!("{}", CompressionFormat::None), "none");
    }

    #[test]
    fn test_open_decoder_gzip() {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(PAYLOAD).unwrap();
        roundtrip(enc.finish().unwrap(), CompressionFormat::Gzip);
    }

    #[test]
    fn test_open_decoder_xz() {
        let mut enc = xz2::write::XzEncoder::new(Vec::new(), 6);
        enc.write_all(PAYLOAD).unwrap();
        roundtrip(enc.finish().unwrap(), CompressionFormat::Xz);
    }

    #[test]
    fn test_open_decoder_bzip2() {
        let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        enc.write_all(PAYLOAD).unwrap();
        roundtrip(enc.finish().unwrap(), CompressionFormat::Bzip2);
    }

    #[test]
    fn test_open_decoder_lz4() {
        let mut enc = lz4_flex::frame::FrameEncoder::new(Vec::new());
        enc.write_all(PAYLOAD).unwrap();
        roundtrip(enc.finish().unwrap(), CompressionFormat::Lz4);
    }

    #[test]
    fn test_open_decoder_zstd() {
        roundtrip(zstd::encode_all(PAYLOAD, 3).unwrap(), CompressionFormat::Zstd);
    }

    #[test]
    fn test_open_decoder_plain() {
        roundtrip(PAYLOAD.to_vec(), CompressionFormat::None);
    }
}
