//! Byte-order detection and swap primitives.
//!
//! The swaps are written as explicit shift/mask compositions so the result never
//! depends on how the host lays integers out in memory.

/// Host byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the compilation target
    #[inline]
    pub const fn native() -> Self {
        if IS_LITTLE_ENDIAN {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }
}

/// True when the target stores the least significant byte first
pub const IS_LITTLE_ENDIAN: bool = cfg!(target_endian = "little");

/// True when the target stores the most significant byte first
pub const IS_BIG_ENDIAN: bool = cfg!(target_endian = "big");

/// Reverse the byte order of a 16-bit value
#[inline]
pub const fn swap16(value: u16) -> u16 {
    ((value & 0x00FF) << 8) | ((value >> 8) & 0x00FF)
}

/// Reverse the byte order of a 32-bit value
#[inline]
pub const fn swap32(value: u32) -> u32 {
    ((value & 0xFF) << 24)
        | (((value >> 8) & 0xFF) << 16)
        | (((value >> 16) & 0xFF) << 8)
        | ((value >> 24) & 0xFF)
}

/// Reverse the byte order of a 64-bit value
#[inline]
pub const fn swap64(value: u64) -> u64 {
    ((value & 0xFF) << 56)
        | (((value >> 8) & 0xFF) << 48)
        | (((value >> 16) & 0xFF) << 40)
        | (((value >> 24) & 0xFF) << 32)
        | (((value >> 32) & 0xFF) << 24)
        | (((value >> 40) & 0xFF) << 16)
        | (((value >> 48) & 0xFF) << 8)
        | ((value >> 56) & 0xFF)
}

/// Integers whose byte order can be converted between host and wire order.
pub trait Endian: Copy {
    /// Unconditionally reverse the bytes
    fn swap_bytes_explicit(self) -> Self;

    /// Host order to little-endian
    #[inline]
    fn to_little_endian(self) -> Self {
        if IS_LITTLE_ENDIAN {
            self
        } else {
            self.swap_bytes_explicit()
        }
    }

    /// Little-endian to host order
    #[inline]
    fn from_little_endian(self) -> Self {
        self.to_little_endian()
    }

    /// Host order to big-endian
    #[inline]
    fn to_big_endian(self) -> Self {
        if IS_BIG_ENDIAN {
            self
        } else {
            self.swap_bytes_explicit()
        }
    }

    /// Big-endian to host order
    #[inline]
    fn from_big_endian(self) -> Self {
        self.to_big_endian()
    }
}

impl Endian for u16 {
    #[inline]
    fn swap_bytes_explicit(self) -> Self {
        swap16(self)
    }
}

impl Endian for u32 {
    #[inline]
    fn swap_bytes_explicit(self) -> Self {
        swap32(self)
    }
}

impl Endian for u64 {
    #[inline]
    fn swap_bytes_explicit(self) -> Self {
        swap64(self)
    }
}

/// Convert a host-order value to little-endian
#[inline]
pub fn to_little_endian<T: Endian>(value: T) -> T {
    value.to_little_endian()
}

/// Convert a little-endian value to host order
#[inline]
pub fn from_little_endian<T: Endian>(value: T) -> T {
    value.from_little_endian()
}

/// Convert a host-order value to big-endian
#[inline]
pub fn to_big_endian<T: Endian>(value: T) -> T {
    value.to_big_endian()
}

/// Convert a big-endian value to host order
#[inline]
pub fn from_big_endian<T: Endian>(value: T) -> T {
    value.from_big_endian()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_known_values() {
        assert_eq!(swap16(0x1234), 0x3412);
        assert_eq!(swap32(0x1234_5678), 0x7856_3412);
        assert_eq!(swap64(0x0102_0304_0506_0708), 0x0807_0605_0403_0201);
    }

    #[test]
    fn test_swap_matches_core() {
        for v in [0u32, 1, 0xDEAD_BEEF, u32::MAX, 0x8000_0001] {
            assert_eq!(swap32(v), v.swap_bytes());
        }
        assert_eq!(swap64(u64::MAX - 7), (u64::MAX - 7).swap_bytes());
    }

    #[test]
    fn test_byte_order_detection() {
        assert!(IS_LITTLE_ENDIAN ^ IS_BIG_ENDIAN);
        let expected = if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        };
        assert_eq!(ByteOrder::native(), expected);
    }

    #[test]
    fn test_little_endian_conversion_matches_wire_bytes() {
        let value: u32 = 0x1122_3344;
        let le = to_little_endian(value);
        assert_eq!(le.to_ne_bytes(), value.to_le_bytes());
        assert_eq!(from_little_endian(le), value);

        let be = to_big_endian(value);
        assert_eq!(be.to_ne_bytes(), value.to_be_bytes());
        assert_eq!(from_big_endian(be), value);
    }
}
