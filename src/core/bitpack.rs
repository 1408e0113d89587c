//! Sub-byte bit packing.
//!
//! Values are written least-significant bit first within each byte and may straddle
//! byte boundaries. Bits are OR-ed into the buffer, so the target range must start out
//! zeroed.
//!
//! Calls with a width outside `1..=32`, or whose bit range runs past the end of the
//! buffer, are soft failures: nothing is written, the offset comes back unchanged and
//! unpacking yields `0`.
//!
//! ```rust
//! use wire_protocol::core::bitpack::{pack_bits, unpack_bits};
//!
//! let mut buf = [0u8; 2];
//! let off = pack_bits(&mut buf, 0, 0b1010, 4);
//! let off = pack_bits(&mut buf, off, 0x3F, 6);
//! assert_eq!(off, 10);
//! assert_eq!(unpack_bits(&buf, 4, 6), 0x3F);
//! ```

/// Widest value a single call can move
pub const MAX_PACK_BITS: u32 = 32;

/// Round a bit offset up to the next byte boundary
#[inline]
pub const fn align_to_byte(bit_offset: usize) -> usize {
    bit_offset.div_ceil(8) * 8
}

/// Byte index holding the given bit
#[inline]
pub const fn byte_offset(bit_offset: usize) -> usize {
    bit_offset / 8
}

/// Position of the given bit inside its byte
#[inline]
pub const fn bit_in_byte(bit_offset: usize) -> usize {
    bit_offset % 8
}

#[inline]
fn range_fits(len: usize, bit_offset: usize, num_bits: u32) -> bool {
    if num_bits == 0 || num_bits > MAX_PACK_BITS {
        return false;
    }
    bit_offset
        .checked_add(num_bits as usize)
        .is_some_and(|end| end.div_ceil(8) <= len)
}

/// Write the low `num_bits` bits of `value` at `bit_offset`.
///
/// Bits of `value` above `num_bits` are masked off. Returns `bit_offset + num_bits`,
/// or `bit_offset` unchanged on a soft failure.
pub fn pack_bits(buffer: &mut [u8], bit_offset: usize, value: u32, num_bits: u32) -> usize {
    if !range_fits(buffer.len(), bit_offset, num_bits) {
        return bit_offset;
    }

    let mask = ((1u64 << num_bits) - 1) as u32;
    let value = value & mask;

    let mut byte_pos = byte_offset(bit_offset);
    let mut bit_pos = bit_in_byte(bit_offset) as u32;
    let mut written = 0u32;

    while written < num_bits {
        let chunk = (8 - bit_pos).min(num_bits - written);
        let chunk_mask = ((1u16 << chunk) - 1) as u8;
        let bits = ((value >> written) as u8) & chunk_mask;
        buffer[byte_pos] |= bits << bit_pos;

        written += chunk;
        bit_pos += chunk;
        if bit_pos >= 8 {
            byte_pos += 1;
            bit_pos = 0;
        }
    }

    bit_offset + num_bits as usize
}

/// Read `num_bits` bits starting at `bit_offset`.
pub fn unpack_bits(buffer: &[u8], bit_offset: usize, num_bits: u32) -> u32 {
    if !range_fits(buffer.len(), bit_offset, num_bits) {
        return 0;
    }

    let mut byte_pos = byte_offset(bit_offset);
    let mut bit_pos = bit_in_byte(bit_offset) as u32;
    let mut read = 0u32;
    let mut result = 0u32;

    while read < num_bits {
        let chunk = (8 - bit_pos).min(num_bits - read);
        let chunk_mask = ((1u16 << chunk) - 1) as u8;
        let bits = (buffer[byte_pos] >> bit_pos) & chunk_mask;
        result |= u32::from(bits) << read;

        read += chunk;
        bit_pos += chunk;
        if bit_pos >= 8 {
            byte_pos += 1;
            bit_pos = 0;
        }
    }

    result
}

#[inline]
pub fn pack_bool(buffer: &mut [u8], bit_offset: usize, value: bool) -> usize {
    pack_bits(buffer, bit_offset, u32::from(value), 1)
}

#[inline]
pub fn unpack_bool(buffer: &[u8], bit_offset: usize) -> bool {
    unpack_bits(buffer, bit_offset, 1) != 0
}

#[inline]
pub fn pack_uint8(buffer: &mut [u8], bit_offset: usize, value: u8) -> usize {
    pack_bits(buffer, bit_offset, u32::from(value), 8)
}

#[inline]
pub fn unpack_uint8(buffer: &[u8], bit_offset: usize) -> u8 {
    unpack_bits(buffer, bit_offset, 8) as u8
}

/// Pack a `u16` as two 8-bit groups, low byte first.
pub fn pack_uint16(buffer: &mut [u8], bit_offset: usize, value: u16) -> usize {
    if !range_fits(buffer.len(), bit_offset, 16) {
        return bit_offset;
    }
    value
        .to_le_bytes()
        .iter()
        .fold(bit_offset, |off, &b| pack_uint8(buffer, off, b))
}

pub fn unpack_uint16(buffer: &[u8], bit_offset: usize) -> u16 {
    if !range_fits(buffer.len(), bit_offset, 16) {
        return 0;
    }
    u16::from_le_bytes([
        unpack_uint8(buffer, bit_offset),
        unpack_uint8(buffer, bit_offset + 8),
    ])
}

/// Pack a `u32` as four 8-bit groups, low byte first.
pub fn pack_uint32(buffer: &mut [u8], bit_offset: usize, value: u32) -> usize {
    if !range_fits(buffer.len(), bit_offset, 32) {
        return bit_offset;
    }
    value
        .to_le_bytes()
        .iter()
        .fold(bit_offset, |off, &b| pack_uint8(buffer, off, b))
}

pub fn unpack_uint32(buffer: &[u8], bit_offset: usize) -> u32 {
    if !range_fits(buffer.len(), bit_offset, 32) {
        return 0;
    }
    u32::from_le_bytes([
        unpack_uint8(buffer, bit_offset),
        unpack_uint8(buffer, bit_offset + 8),
        unpack_uint8(buffer, bit_offset + 16),
        unpack_uint8(buffer, bit_offset + 24),
    ])
}

/// Sequential bit writer over a borrowed buffer.
#[derive(Debug)]
pub struct BitWriter<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> BitWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Current position in bits
    pub fn bit_offset(&self) -> usize {
        self.offset
    }

    /// Write a value; returns false if it did not fit.
    pub fn write_bits(&mut self, value: u32, num_bits: u32) -> bool {
        let next = pack_bits(self.buffer, self.offset, value, num_bits);
        let advanced = next != self.offset;
        self.offset = next;
        advanced
    }

    pub fn write_bool(&mut self, value: bool) -> bool {
        self.write_bits(u32::from(value), 1)
    }

    /// Skip to the next byte boundary
    pub fn align(&mut self) {
        self.offset = align_to_byte(self.offset).min(self.buffer.len() * 8);
    }

    /// Bytes touched so far, counting a partial trailing byte
    pub fn bytes_used(&self) -> usize {
        self.offset.div_ceil(8)
    }
}

/// Sequential bit reader over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn bit_offset(&self) -> usize {
        self.offset
    }

    /// Bits left before the end of the buffer
    pub fn remaining_bits(&self) -> usize {
        (self.buffer.len() * 8).saturating_sub(self.offset)
    }

    /// Read a value, or `None` if the range runs past the buffer.
    pub fn read_bits(&mut self, num_bits: u32) -> Option<u32> {
        if !range_fits(self.buffer.len(), self.offset, num_bits) {
            return None;
        }
        let value = unpack_bits(self.buffer, self.offset, num_bits);
        self.offset += num_bits as usize;
        Some(value)
    }

    pub fn read_bool(&mut self) -> Option<bool> {
        self.read_bits(1).map(|b| b != 0)
    }

    pub fn align(&mut self) {
        self.offset = align_to_byte(self.offset).min(self.buffer.len() * 8);
    }
}
