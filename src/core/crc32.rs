//! Table-driven CRC32 (IEEE 802.3, reflected polynomial `0xEDB88320`).
//!
//! The lookup table is generated at compile time, so it is immutable from the first
//! call onward and concurrent first use cannot observe a partially built table.

/// Reflected CRC32 polynomial
pub const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

const CRC32_INIT: u32 = 0xFFFF_FFFF;

static CRC32_TABLE: [u32; 256] = generate_crc32_table();

const fn generate_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;

        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC32_POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

#[inline]
fn update_register(mut crc: u32, data: &[u8]) -> u32 {
    for &byte in data {
        let idx = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[idx];
    }
    crc
}

/// CRC32 of a byte range
#[inline]
pub fn checksum(data: &[u8]) -> u32 {
    update_register(CRC32_INIT, data) ^ CRC32_INIT
}

/// Compare the CRC32 of `data` with an expected value
#[inline]
pub fn verify(data: &[u8], expected: u32) -> bool {
    checksum(data) == expected
}

/// Incremental CRC32 over data arriving in pieces.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    register: u32,
}

impl Crc32 {
    pub const fn new() -> Self {
        Self {
            register: CRC32_INIT,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.register = update_register(self.register, data);
    }

    /// Checksum of everything fed so far. The hasher stays usable.
    pub fn finalize(&self) -> u32 {
        self.register ^ CRC32_INIT
    }

    pub fn reset(&mut self) {
        self.register = CRC32_INIT;
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}
