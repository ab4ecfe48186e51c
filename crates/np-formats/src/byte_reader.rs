//! Big-endian cursor over a byte slice.

use crate::FormatError;

/// Big-endian read cursor with MIDI variable-length and 7-bit helpers.
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(FormatError::OutOfRange { offset: self.pos, wanted: n, len: self.data.len() });
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u32(&mut self) -> Result<u32, FormatError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u24(&mut self) -> Result<u32, FormatError> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn read_u16(&mut self) -> Result<u16, FormatError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, FormatError> {
        Ok(self.read_u8()? as i8)
    }

    /// The next byte, without consuming it.
    pub fn peek_u8(&self) -> Result<u8, FormatError> {
        self.data.get(self.pos).copied().ok_or(FormatError::OutOfRange {
            offset: self.pos,
            wanted: 1,
            len: self.data.len(),
        })
    }

    pub fn skip_bytes(&mut self, n: usize) -> Result<(), FormatError> {
        self.take(n).map(|_| ())
    }

    pub fn has_more(&self) -> bool {
        self.pos < self.data.len()
    }

    /// A reader over the next `n` bytes; this reader moves past them.
    pub fn reader_for_next_bytes(&mut self, n: usize) -> Result<ByteReader<'a>, FormatError> {
        Ok(ByteReader::new(self.take(n)?))
    }

    /// The next `n` bytes as a slice; this reader moves past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        self.take(n)
    }

    /// A 7-bit data byte. A stray high bit is logged and masked off.
    pub fn read_midi_7bits(&mut self) -> Result<u8, FormatError> {
        let offset = self.pos;
        let value = self.read_u8()?;
        if value & 0x80 != 0 {
            log::warn!("[MIDI] 7-bit value {:#04x} at offset {} has its 8th bit set", value, offset);
        }
        Ok(value & 0x7F)
    }

    /// A variable-length quantity of at most four bytes.
    pub fn read_midi_variable_length(&mut self) -> Result<u32, FormatError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let byte = self.read_u8()?;
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                break;
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian() {
        let data = [0x12, 0x34, 0x56, 0x78, 0xAB, 0xCD, 0xEF, 0x01, 0x02, 0xFF];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(r.read_u24().unwrap(), 0xAB_CDEF);
        assert_eq!(r.read_u16().unwrap(), 0x0102);
        assert_eq!(r.peek_u8().unwrap(), 0xFF);
        assert_eq!(r.read_i8().unwrap(), -1);
        assert!(!r.has_more());
    }

    #[test]
    fn read_past_end_fails() {
        let data = [1, 2, 3];
        let mut r = ByteReader::new(&data);
        assert!(matches!(
            r.read_u32(),
            Err(FormatError::OutOfRange { offset: 0, wanted: 4, len: 3 })
        ));
        // the failed read does not move the cursor
        assert_eq!(r.read_u24().unwrap(), 0x010203);
        assert!(r.read_u8().is_err());
        assert!(r.peek_u8().is_err());
        assert!(r.skip_bytes(1).is_err());
    }

    #[test]
    fn sub_reader_is_scoped() {
        let data = [0xAA, 0xBB, 0xCC, 0xDD];
        let mut r = ByteReader::new(&data);
        let mut sub = r.reader_for_next_bytes(2).unwrap();
        assert_eq!(r.read_u8().unwrap(), 0xCC);
        assert_eq!(sub.read_u16().unwrap(), 0xAABB);
        assert!(sub.read_u8().is_err());
        assert!(r.reader_for_next_bytes(2).is_err());
    }

    #[test]
    fn variable_length_quantities() {
        let cases: &[(&[u8], u32)] = &[
            (&[0x00], 0),
            (&[0x7F], 0x7F),
            (&[0x81, 0x00], 0x80),
            (&[0xC0, 0x00], 0x2000),
            (&[0xFF, 0x7F], 0x3FFF),
            (&[0x81, 0x80, 0x00], 0x4000),
            (&[0xFF, 0xFF, 0xFF, 0x7F], 0x0FFF_FFFF),
        ];
        for (bytes, expected) in cases {
            let mut r = ByteReader::new(bytes);
            assert_eq!(r.read_midi_variable_length().unwrap(), *expected);
            assert!(!r.has_more());
        }
    }

    #[test]
    fn variable_length_stops_after_four_bytes() {
        let data = [0x80, 0x80, 0x80, 0x81, 0x05];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_midi_variable_length().unwrap(), 1);
        assert_eq!(r.read_u8().unwrap(), 0x05);
    }

    #[test]
    fn seven_bit_masks_high_bit() {
        let data = [0x85, 0x05];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_midi_7bits().unwrap(), 0x05);
        assert_eq!(r.read_midi_7bits().unwrap(), 0x05);
    }
}
