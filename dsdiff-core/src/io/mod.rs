//! Composable byte-level I/O for the DSDIFF engine.
//!
//! A `ReadBytes` trait provides endian-aware scalar reads over anything that can hand
//! back raw bytes, and a sibling `WriteBytes` trait does the same for writes. This
//! engine also needs to write and rewrite files, so `ByteStream` wraps a concrete
//! `Read + Write + Seek` source directly rather than a read-ahead ring buffer.

mod stream;

pub use stream::{ByteStream, OpenMode, SeekOrigin};

use crate::errors::Result;
use std::mem;

/// Reads bytes and interprets them as big-endian scalars. This crate only ever needs
/// big-endian DSDIFF fields, so no little-endian counterparts are provided.
pub trait ReadBytes {
    fn read_byte(&mut self) -> Result<u8>;
    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    #[inline]
    fn read_u8(&mut self) -> Result<u8> {
        self.read_byte()
    }

    #[inline]
    fn read_be_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_buf_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    #[inline]
    fn read_be_i16(&mut self) -> Result<i16> {
        Ok(self.read_be_u16()? as i16)
    }

    #[inline]
    fn read_be_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_buf_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    #[inline]
    fn read_be_i32(&mut self) -> Result<i32> {
        Ok(self.read_be_u32()? as i32)
    }

    #[inline]
    fn read_be_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_buf_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    #[inline]
    fn read_quad_bytes(&mut self) -> Result<[u8; 4]> {
        let mut buf = [0u8; mem::size_of::<[u8; 4]>()];
        self.read_buf_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_boxed_slice_exact(&mut self, len: usize) -> Result<Box<[u8]>> {
        let mut buf = vec![0u8; len];
        self.read_buf_exact(&mut buf)?;
        Ok(buf.into_boxed_slice())
    }

    /// Reads a pstring: one length byte followed by that many bytes of UTF-8 (lossy),
    /// then a pad byte if `(len + 1)` is odd.
    fn read_pstring(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_boxed_slice_exact(len)?;
        if (len + 1) % 2 != 0 {
            self.read_u8()?;
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Skips `count` bytes by reading and discarding them.
    fn ignore_bytes(&mut self, count: u64) -> Result<()> {
        let mut remaining = count;
        let mut scratch = [0u8; 1024];
        while remaining > 0 {
            let n = remaining.min(scratch.len() as u64) as usize;
            self.read_buf_exact(&mut scratch[..n])?;
            remaining -= n as u64;
        }
        Ok(())
    }
}

/// Writes big-endian scalars, the write-side counterpart of `ReadBytes`.
pub trait WriteBytes {
    fn write_byte(&mut self, byte: u8) -> Result<()>;
    fn write_buf(&mut self, buf: &[u8]) -> Result<()>;

    #[inline]
    fn write_be_u16(&mut self, value: u16) -> Result<()> {
        self.write_buf(&value.to_be_bytes())
    }

    #[inline]
    fn write_be_u32(&mut self, value: u32) -> Result<()> {
        self.write_buf(&value.to_be_bytes())
    }

    #[inline]
    fn write_be_u64(&mut self, value: u64) -> Result<()> {
        self.write_buf(&value.to_be_bytes())
    }

    fn write_quad_bytes(&mut self, tag: &[u8; 4]) -> Result<()> {
        self.write_buf(tag)
    }

    /// Writes a pstring: one length byte (truncated to 255 bytes), the bytes, then a
    /// pad byte if `(len + 1)` is odd.
    fn write_pstring(&mut self, s: &str) -> Result<()> {
        let bytes = s.as_bytes();
        let len = bytes.len().min(255);
        self.write_byte(len as u8)?;
        self.write_buf(&bytes[..len])?;
        if (len + 1) % 2 != 0 {
            self.write_byte(0)?;
        }
        Ok(())
    }

    /// Writes a single zero pad byte iff `size` is odd, maintaining the
    /// word-alignment invariant every chunk payload must satisfy.
    fn write_pad_if_odd(&mut self, size: u64) -> Result<()> {
        if size % 2 != 0 {
            self.write_byte(0)?;
        }
        Ok(())
    }
}
