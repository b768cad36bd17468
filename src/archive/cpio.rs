// src/archive/cpio.rs

//! CPIO New ASCII (newc) reading and writing

use std::io::{self, Read, Write};

/// CPIO New ASCII Format (newc) header size
const HEADER_SIZE: usize = 110;
/// Magic string for newc format
const MAGIC_NEWC: &[u8] = b"070701";
/// Magic string for CRC format
const MAGIC_CRC: &[u8] = b"070702";
/// Name of the end-of-archive marker entry
const TRAILER: &str = "TRAILER!!!";

pub const S_IFMT: u32 = 0o170000;
pub const S_IFIFO: u32 = 0o010000;
pub const S_IFCHR: u32 = 0o020000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFBLK: u32 = 0o060000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFLNK: u32 = 0o120000;

/// Padding needed to bring `len` to a 4-byte boundary
fn pad4(len: usize) -> usize {
    (4 - (len % 4)) % 4
}

/// CPIO entry metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpioHeader {
    pub name: String,
    pub size: u64,
    /// File type bits and permissions
    pub mode: u32,
    pub mtime: u64,
    pub uid: u32,
    pub gid: u32,
    pub ino: u32,
    pub nlink: u32,
    pub dev_major: u32,
    pub dev_minor: u32,
    pub rdev_major: u32,
    pub rdev_minor: u32,
}

impl CpioHeader {
    pub fn file_type(&self) -> u32 {
        self.mode & S_IFMT
    }
}

/// A reader for CPIO (New ASCII) archives
pub struct CpioReader<R: Read> {
    reader: R,
}

impl<R: Read> CpioReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next entry from the CPIO archive
    /// Returns Ok(None) at the trailer or at a clean end of stream
    pub fn next_entry(&mut self) -> io::Result<Option<(CpioHeader, Vec<u8>)>> {
        let mut header_buf = [0u8; HEADER_SIZE];
        if let Err(e) = self.reader.read_exact(&mut header_buf) {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                return Ok(None);
            }
            return Err(e);
        }

        let magic = &header_buf[0..6];
        if magic != MAGIC_NEWC && magic != MAGIC_CRC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid CPIO magic: {:?}", String::from_utf8_lossy(magic)),
            ));
        }

        let parse_hex = |start: usize| -> io::Result<u32> {
            let s = std::str::from_utf8(&header_buf[start..start + 8])
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            u32::from_str_radix(s, 16).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        };

        let mut header = CpioHeader {
            ino: parse_hex(6)?,
            mode: parse_hex(14)?,
            uid: parse_hex(22)?,
            gid: parse_hex(30)?,
            nlink: parse_hex(38)?,
            mtime: parse_hex(46)? as u64,
            size: parse_hex(54)? as u64,
            dev_major: parse_hex(62)?,
            dev_minor: parse_hex(70)?,
            rdev_major: parse_hex(78)?,
            rdev_minor: parse_hex(86)?,
            ..Default::default()
        };
        let namesize = parse_hex(94)? as usize;

        // Filename including trailing NUL
        let mut name_buf = vec![0u8; namesize];
        self.reader.read_exact(&mut name_buf)?;
        if name_buf.last() == Some(&0) {
            name_buf.pop();
        }
        header.name = String::from_utf8_lossy(&name_buf).into_owned();

        if header.name == TRAILER {
            return Ok(None);
        }

        self.skip(pad4(HEADER_SIZE + namesize))?;

        let mut content = vec![0u8; header.size as usize];
        self.reader.read_exact(&mut content)?;
        self.skip(pad4(header.size as usize))?;

        Ok(Some((header, content)))
    }

    fn skip(&mut self, pad: usize) -> io::Result<()> {
        let mut skip = [0u8; 3];
        self.reader.read_exact(&mut skip[..pad])
    }
}

/// A writer for CPIO (New ASCII) archives
///
/// Each entry is a header followed by exactly `size` bytes of data written
/// through [`CpioWriter::write_data`]. [`CpioWriter::finish`] appends the
/// trailer and hands back the inner writer.
pub struct CpioWriter<W: Write> {
    writer: W,
    /// Data bytes still owed to the current entry
    remaining: u64,
    /// Padding owed after the current entry's data
    pending_pad: usize,
    next_ino: u32,
}

impl<W: Write> CpioWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            remaining: 0,
            pending_pad: 0,
            next_ino: 1,
        }
    }

    /// Start a new entry
    ///
    /// An `ino` of 0 is replaced by a sequential inode number.
    pub fn write_header(&mut self, header: &CpioHeader) -> io::Result<()> {
        self.finish_entry()?;

        let size = u32::try_from(header.size).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{}: {} bytes exceeds the newc size limit", header.name, header.size),
            )
        })?;
        let ino = if header.ino == 0 {
            let ino = self.next_ino;
            self.next_ino = self.next_ino.wrapping_add(1);
            ino
        } else {
            header.ino
        };

        self.write_raw_header(header, ino, size)?;
        self.remaining = header.size;
        self.pending_pad = pad4(header.size as usize);
        Ok(())
    }

    fn write_raw_header(&mut self, header: &CpioHeader, ino: u32, size: u32) -> io::Result<()> {
        let name = header.name.as_bytes();
        if name.contains(&0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("entry name contains NUL: {:?}", header.name),
            ));
        }
        let namesize = name.len() + 1;
        let mtime = u32::try_from(header.mtime).unwrap_or(u32::MAX);

        let fields = format!(
            "{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}",
            ino,
            header.mode,
            header.uid,
            header.gid,
            header.nlink,
            mtime,
            size,
            header.dev_major,
            header.dev_minor,
            header.rdev_major,
            header.rdev_minor,
            namesize,
            0u32, // check
        );

        self.writer.write_all(MAGIC_NEWC)?;
        self.writer.write_all(fields.as_bytes())?;
        self.writer.write_all(name)?;
        self.writer.write_all(&[0u8])?;
        self.writer.write_all(&[0u8; 3][..pad4(HEADER_SIZE + namesize)])
    }

    /// Append data to the current entry
    ///
    /// Writing past the size announced in the header is an error.
    pub fn write_data(&mut self, buf: &[u8]) -> io::Result<()> {
        if buf.len() as u64 > self.remaining {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{} bytes exceeds the {} remaining in this entry",
                    buf.len(),
                    self.remaining
                ),
            ));
        }
        self.writer.write_all(buf)?;
        self.remaining -= buf.len() as u64;
        Ok(())
    }

    fn finish_entry(&mut self) -> io::Result<()> {
        if self.remaining != 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("entry is {} bytes short of its declared size", self.remaining),
            ));
        }
        let pad = std::mem::take(&mut self.pending_pad);
        self.writer.write_all(&[0u8; 3][..pad])
    }

    /// Write the trailer and return the inner writer
    pub fn finish(mut self) -> io::Result<W> {
        self.finish_entry()?;
        let trailer = CpioHeader {
            name: TRAILER.to_string(),
            nlink: 1,
            ..Default::default()
        };
        self.write_raw_header(&trailer, 0, 0)?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}
