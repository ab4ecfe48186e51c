//! Growable big-endian byte writer.

use crate::FormatError;

/// Largest value a four-byte variable-length quantity can carry.
pub const MAX_VARIABLE_LENGTH: u32 = 0x0FFF_FFFF;

/// Big-endian writer over a growable buffer.
///
/// The backing buffer is always fully allocated; `size` tracks how much of it
/// has been written. Only writes move `size`.
#[derive(Clone, Debug)]
pub struct ByteWriter {
    buffer: Vec<u8>,
    size: usize,
}

impl ByteWriter {
    pub fn new(capacity: usize) -> Self {
        Self { buffer: vec![0; capacity.max(1)], size: 0 }
    }

    /// Bytes written so far.
    pub fn write_index(&self) -> usize {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    fn reserve(&mut self, additional: usize) {
        let required = self.size + additional;
        if required <= self.buffer.len() {
            return;
        }
        let mut grown = vec![0; (self.buffer.len() * 2).max(required)];
        transfer(&self.buffer[..self.size], &mut grown);
        self.buffer = grown;
    }

    fn put(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.buffer[self.size..self.size + bytes.len()].copy_from_slice(bytes);
        self.size += bytes.len();
    }

    pub fn write_u32(&mut self, value: u32) {
        self.put(&value.to_be_bytes());
    }

    /// The low 24 bits of `value`.
    pub fn write_u24(&mut self, value: u32) {
        self.put(&value.to_be_bytes()[1..]);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.put(&value.to_be_bytes());
    }

    pub fn write_u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.put(&value.to_be_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.put(bytes);
    }

    /// Overwrite four already-written bytes at `index`.
    pub fn rewrite_u32(&mut self, index: usize, value: u32) -> Result<(), FormatError> {
        if index.checked_add(4).map_or(true, |end| end > self.size) {
            return Err(FormatError::OutOfRange { offset: index, wanted: 4, len: self.size });
        }
        self.buffer[index..index + 4].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn write_midi_7bits(&mut self, value: u32) -> Result<(), FormatError> {
        if value >= 0x80 {
            return Err(FormatError::SevenBitOverflow(value));
        }
        self.write_u8(value as u8);
        Ok(())
    }

    /// A variable-length quantity in as few bytes as possible.
    pub fn write_midi_variable_length(&mut self, value: u32) -> Result<(), FormatError> {
        if value > MAX_VARIABLE_LENGTH {
            return Err(FormatError::VariableLengthOverflow(value));
        }
        let mut started = false;
        for shift in [21, 14, 7] {
            let group = (value >> shift) & 0x7F;
            if started || group != 0 {
                self.write_u8(0x80 | group as u8);
                started = true;
            }
        }
        self.write_u8((value & 0x7F) as u8);
        Ok(())
    }

    /// Length-prefixed ASCII text.
    pub fn write_midi_ascii(&mut self, text: &str) -> Result<(), FormatError> {
        if !text.is_ascii() {
            return Err(FormatError::NonAscii(text.to_owned()));
        }
        self.write_midi_variable_length(text.len() as u32)?;
        self.put(text.as_bytes());
        Ok(())
    }

    /// Exactly the bytes written so far.
    pub fn to_compact_buffer(&self) -> Vec<u8> {
        self.buffer[..self.size].to_vec()
    }
}

// ---------------------------------------------------------------------------
// Buffer growth
// ---------------------------------------------------------------------------

macro_rules! copy_words {
    ($ty:ty, $width:expr, $src:expr, $dst:expr) => {
        for (s, d) in $src.chunks_exact($width).zip($dst.chunks_exact_mut($width)) {
            let mut word = [0u8; $width];
            word.copy_from_slice(s);
            d.copy_from_slice(&<$ty>::from_be_bytes(word).to_be_bytes());
        }
    };
}

/// Copy `src` to the front of `dst` in the widest word that evenly divides it.
fn transfer(src: &[u8], dst: &mut [u8]) {
    match src.len() {
        n if n % 8 == 0 => copy_words!(u64, 8, src, dst),
        n if n % 4 == 0 => copy_words!(u32, 4, src, dst),
        n if n % 2 == 0 => copy_words!(u16, 2, src, dst),
        _ => dst[..src.len()].copy_from_slice(src),
    }
}
