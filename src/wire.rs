//! Length-checked reads and writes over a byte region.
//!
//! Two views are exposed: [`OwnedBuf`], which owns and grows a `Vec<u8>` for
//! building frames, and [`Cursor`], a borrowed, bounds-checked read cursor
//! over `&[u8]` for parsing them. Every reader/writer here either succeeds
//! or returns [`WireError::OutOfBounds`]; none of them panic on malformed
//! or truncated input.

use thiserror::Error;

/// A read or write would run past the end of the buffer, or a negative
/// length was requested. No partial read or write is ever observed by the
/// caller: on error the cursor position is unchanged.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    #[error("out of bounds")]
    OutOfBounds,
}

pub type Result<T> = std::result::Result<T, WireError>;

/// A bounds-checked, borrowed read cursor.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            Err(WireError::OutOfBounds)
        } else {
            Ok(())
        }
    }

    /// Advance the start of the cursor by `n` bytes, discarding them.
    pub fn strip(&mut self, n: usize) -> Result<()> {
        self.need(n)?;
        self.pos += n;
        Ok(())
    }

    /// Truncate the cursor so only the next `n` bytes remain visible,
    /// returning a cursor over exactly that prefix. The parent cursor is
    /// advanced past it.
    pub fn take(&mut self, n: usize) -> Result<Cursor<'a>> {
        self.need(n)?;
        let start = self.pos;
        self.pos += n;
        Ok(Cursor { buf: &self.buf[start..self.pos], pos: 0 })
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.need(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_u8().map(|v| v as i8)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.need(2)?;
        let v = u16::from_le_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        self.need(2)?;
        let v = u16::from_be_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.need(4)?;
        let b = &self.buf[self.pos..self.pos + 4];
        let v = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        self.pos += 4;
        Ok(v)
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        self.need(4)?;
        let b = &self.buf[self.pos..self.pos + 4];
        let v = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
        self.pos += 4;
        Ok(v)
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        self.need(8)?;
        let b = &self.buf[self.pos..self.pos + 8];
        let v = u64::from_le_bytes(b.try_into().unwrap());
        self.pos += 8;
        Ok(v)
    }

    /// A 6-byte IEEE 802 hardware address.
    pub fn read_addr(&mut self) -> Result<[u8; 6]> {
        self.need(6)?;
        let mut addr = [0u8; 6];
        addr.copy_from_slice(&self.buf[self.pos..self.pos + 6]);
        self.pos += 6;
        Ok(addr)
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.need(n)?;
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    /// A length-prefixed string: one unsigned length byte, then that many
    /// bytes, lossily decoded as UTF-8 and truncated to `max` bytes of
    /// payload. The length byte itself is always consumed even if the
    /// payload is truncated for the caller's sake.
    pub fn read_int_string(&mut self, max: usize) -> Result<String> {
        let len = self.read_u8()? as usize;
        let take = len.min(max);
        let s = self.read_bytes(take)?;
        if take < len {
            self.strip(len - take)?;
        }
        Ok(String::from_utf8_lossy(s).into_owned())
    }

    /// A TLV header: 1-byte type, 2-byte little-endian length, followed by
    /// that many value bytes. Returns `(type, value)`.
    pub fn read_tlv(&mut self) -> Result<(u8, &'a [u8])> {
        let ty = self.read_u8()?;
        let len = self.read_u16_le()? as usize;
        let val = self.read_bytes(len)?;
        Ok((ty, val))
    }
}

/// An owned, growable byte region used to build frames for transmission.
#[derive(Debug, Default, Clone)]
pub struct OwnedBuf {
    data: Vec<u8>,
}

impl OwnedBuf {
    pub fn new() -> Self {
        OwnedBuf { data: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        OwnedBuf { data: Vec::with_capacity(cap) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub fn write_u16_le(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u16_be(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32_le(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_addr(&mut self, addr: &[u8; 6]) {
        self.data.extend_from_slice(addr);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write a TLV header (type, LE16 length) followed by `value`.
    pub fn write_tlv(&mut self, ty: u8, value: &[u8]) {
        self.write_u8(ty);
        self.write_u16_le(value.len() as u16);
        self.write_bytes(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_roundtrip_le() {
        let mut w = OwnedBuf::new();
        w.write_u16_le(0x1234);
        w.write_u32_le(0xdead_beef);
        let bytes = w.into_vec();
        let mut c = Cursor::new(&bytes);
        assert_eq!(c.read_u16_le().unwrap(), 0x1234);
        assert_eq!(c.read_u32_le().unwrap(), 0xdead_beef);
        assert!(c.is_empty());
    }

    #[test]
    fn read_write_roundtrip_be() {
        let mut w = OwnedBuf::new();
        w.write_u16_be(0x1234);
        let bytes = w.into_vec();
        let mut c = Cursor::new(&bytes);
        assert_eq!(c.read_u16_be().unwrap(), 0x1234);
    }

    #[test]
    fn out_of_bounds_does_not_advance() {
        let bytes = [0u8; 2];
        let mut c = Cursor::new(&bytes);
        assert_eq!(c.read_u32_le(), Err(WireError::OutOfBounds));
        // position unchanged: still 2 bytes available for a u16 read
        assert_eq!(c.read_u16_le().unwrap(), 0);
    }

    #[test]
    fn strip_and_take_bounds() {
        let bytes = [1, 2, 3, 4, 5];
        let mut c = Cursor::new(&bytes);
        c.strip(1).unwrap();
        let mut taken = c.take(2).unwrap();
        assert_eq!(taken.read_u8().unwrap(), 2);
        assert_eq!(taken.read_u8().unwrap(), 3);
        assert_eq!(taken.read_u8(), Err(WireError::OutOfBounds));
        assert_eq!(c.remaining(), 2);
        assert!(c.strip(10).is_err());
    }

    #[test]
    fn tlv_roundtrip() {
        let mut w = OwnedBuf::new();
        w.write_tlv(4, &[1, 2, 3]);
        let bytes = w.into_vec();
        let mut c = Cursor::new(&bytes);
        let (ty, val) = c.read_tlv().unwrap();
        assert_eq!(ty, 4);
        assert_eq!(val, &[1, 2, 3]);
    }

    #[test]
    fn int_string_truncates_to_max() {
        let mut w = OwnedBuf::new();
        w.write_u8(5);
        w.write_bytes(b"hello");
        let bytes = w.into_vec();
        let mut c = Cursor::new(&bytes);
        assert_eq!(c.read_int_string(3).unwrap(), "hel");
        assert!(c.is_empty());
    }

    #[test]
    fn addr_roundtrip() {
        let addr = [0x00, 0x17, 0xf2, 0x01, 0x02, 0x03];
        let mut w = OwnedBuf::new();
        w.write_addr(&addr);
        let bytes = w.into_vec();
        let mut c = Cursor::new(&bytes);
        assert_eq!(c.read_addr().unwrap(), addr);
    }
}
