//! Cursor primitives shared by the handshake and ISO document codecs.
//!
//! These stand in for the bit-stream cursor a real EXI library would
//! expose; see the module-level docs on [`crate::exi`] for why this
//! crate owns a structured binary codec rather than a conformant EXI
//! bitstream.

use crate::error::CodecError;

/// Read cursor over a borrowed byte slice.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn need(&self, n: usize) -> Result<(), CodecError> {
        if self.remaining() < n {
            Err(CodecError::UnexpectedEof(self.pos))
        } else {
            Ok(())
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.need(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8, CodecError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        self.need(2)?;
        let v = u16::from_be_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_i16(&mut self) -> Result<i16, CodecError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        self.need(n)?;
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Length-prefixed (u8) byte string, as used for `SessionID`, `EVCCID`, etc.
    pub fn read_byte_string(&mut self, field: &'static str, max: usize) -> Result<Vec<u8>, CodecError> {
        let len = self.read_u8()? as usize;
        if len > max {
            return Err(CodecError::StringTooLong { field, max });
        }
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Length-prefixed (u16) UTF-8 string, as used for `EVSEID`, namespaces, etc.
    pub fn read_string(&mut self, field: &'static str, max: usize) -> Result<String, CodecError> {
        let len = self.read_u16()? as usize;
        if len > max {
            return Err(CodecError::StringTooLong { field, max });
        }
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::StringTooLong { field, max })
    }
}

/// Write cursor over a borrowed mutable byte slice.
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start writing at a given offset (used to leave room for the V2GTP
    /// header before the encoded body, per the wire-framing contract).
    pub fn at(buf: &'a mut [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn need(&self, n: usize, field: &'static str) -> Result<(), CodecError> {
        if self.buf.len() - self.pos < n {
            Err(CodecError::BufferTooSmall(field))
        } else {
            Ok(())
        }
    }

    pub fn write_u8(&mut self, v: u8) -> Result<(), CodecError> {
        self.need(1, "u8")?;
        self.buf[self.pos] = v;
        self.pos += 1;
        Ok(())
    }

    pub fn write_i8(&mut self, v: i8) -> Result<(), CodecError> {
        self.write_u8(v as u8)
    }

    pub fn write_bool(&mut self, v: bool) -> Result<(), CodecError> {
        self.write_u8(v as u8)
    }

    pub fn write_u16(&mut self, v: u16) -> Result<(), CodecError> {
        self.need(2, "u16")?;
        let b = v.to_be_bytes();
        self.buf[self.pos..self.pos + 2].copy_from_slice(&b);
        self.pos += 2;
        Ok(())
    }

    pub fn write_i16(&mut self, v: i16) -> Result<(), CodecError> {
        self.write_u16(v as u16)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.need(bytes.len(), "bytes")?;
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    pub fn write_byte_string(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.write_u8(bytes.len() as u8)?;
        self.write_bytes(bytes)
    }

    pub fn write_string(&mut self, s: &str) -> Result<(), CodecError> {
        self.write_u16(s.len() as u16)?;
        self.write_bytes(s.as_bytes())
    }
}
