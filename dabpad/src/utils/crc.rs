//! CRC utilities for DAB data groups and DAB+ superframes.
//!
//! Two CRC-16 variants are used:
//!
//! - **CRC-16-CCITT** (x^16 + x^12 + x^5 + 1), preset to all ones and
//!   inverted on output. Protects PAD data groups (DGLI, dynamic label, MOT)
//!   and DAB+ access units. The stored value is big-endian.
//! - **Fire code** (x^16 + x^14 + x^13 + x^12 + x^11 + x^5 + x^3 + x^2 + x + 1),
//!   no preset, no inversion. Protects the DAB+ superframe header.

/// CRC algorithm parameters: polynomial, initial value and output XOR.
pub struct Algorithm<T> {
    poly: T,
    init: T,
    xorout: T,
}

/// CRC-16-CCITT as used by X-PAD data groups and DAB+ access units.
pub const CRC_CCITT_ALG: Algorithm<u16> = Algorithm {
    poly: 0x1021,
    init: 0xFFFF,
    xorout: 0xFFFF,
};

/// Fire code CRC protecting the first bytes of a DAB+ superframe.
pub const CRC_FIRE_CODE_ALG: Algorithm<u16> = Algorithm {
    poly: 0x782F,
    init: 0x0000,
    xorout: 0x0000,
};

/// Shared CRC-16-CCITT instance, table built at compile time.
pub static CRC_CCITT: Crc16 = Crc16::new(&CRC_CCITT_ALG);

/// Shared fire code instance, table built at compile time.
pub static CRC_FIRE_CODE: Crc16 = Crc16::new(&CRC_FIRE_CODE_ALG);

/// Shifts `len` bits through a CRC-16 register with the given polynomial.
#[inline(always)]
pub const fn crc16(poly: u16, mut value: u16, len: usize) -> u16 {
    value <<= 8;

    let mut i = 0;
    while i < len {
        value = (value << 1) ^ (((value >> 15) & 1) * poly);
        i += 1;
    }

    value
}

#[inline(always)]
const fn crc16_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = crc16(poly, i as u16, 8);
        i += 1;
    }

    table
}

#[derive(Debug)]
pub struct Crc16 {
    pub poly: u16,
    pub init: u16,
    pub xorout: u16,
    table: [u16; 256],
}

impl Crc16 {
    pub const fn new(algorithm: &Algorithm<u16>) -> Self {
        Self {
            poly: algorithm.poly,
            init: algorithm.init,
            xorout: algorithm.xorout,
            table: crc16_table(algorithm.poly),
        }
    }

    const fn table_entry(&self, index: u16) -> u16 {
        self.table[(index & 0xFF) as usize]
    }

    /// Feeds `bytes` into a running register without applying the output XOR.
    #[inline(always)]
    pub const fn update(&self, mut crc: u16, bytes: &[u8]) -> u16 {
        let mut i = 0;

        while i < bytes.len() {
            crc = self.table_entry((crc >> 8) ^ bytes[i] as u16) ^ (crc << 8);
            i += 1;
        }

        crc
    }

    /// Complete checksum of `bytes`: preset, update and final XOR.
    #[inline(always)]
    pub const fn checksum(&self, bytes: &[u8]) -> u16 {
        self.update(self.init, bytes) ^ self.xorout
    }

    /// Compares the checksum of `bytes` with a stored big-endian value.
    pub fn verify(&self, bytes: &[u8], stored: [u8; 2]) -> bool {
        self.checksum(bytes) == u16::from_be_bytes(stored)
    }
}
