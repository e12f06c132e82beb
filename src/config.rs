//! Chip geometry and timing configuration.
//!
//! Mirrors `spiflash_config_t` from the original driver: everything that
//! varies by chip but not by instance (size, page size, address framing,
//! nominal operation timings).

/// Address byte order used when framing a command's address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressEndian {
    /// LSB first on the wire (`0x01020304` → `04 03 02`).
    Little,
    /// MSB first on the wire (`0x01020304` → `01 02 03`). The common case.
    Big,
}

/// Nominal operation timings, in milliseconds, as found in the datasheet.
///
/// If a busy GPIO is wired to the host instead, set every field to `0` —
/// the busy-wait backoff short-circuits entirely rather than polling the
/// status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timing {
    pub sr_write_ms: u32,
    pub page_program_ms: u32,
    pub block_erase_4_ms: u32,
    pub block_erase_8_ms: u32,
    pub block_erase_16_ms: u32,
    pub block_erase_32_ms: u32,
    pub block_erase_64_ms: u32,
    pub chip_erase_ms: u32,
}

impl Timing {
    pub(crate) fn erase_ms(&self, size_bytes: u32) -> u32 {
        match size_bytes {
            x if x == 4 * 1024 => self.block_erase_4_ms,
            x if x == 8 * 1024 => self.block_erase_8_ms,
            x if x == 16 * 1024 => self.block_erase_16_ms,
            x if x == 32 * 1024 => self.block_erase_32_ms,
            x if x == 64 * 1024 => self.block_erase_64_ms,
            _ => 0,
        }
    }
}

/// Flash geometry and timing, found in the part's datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipConfig {
    /// Total flash size, in bytes.
    pub size: u32,
    /// Page-program granularity, in bytes (typically 256).
    pub page_size: u32,
    /// Address field width, in bytes (2, 3, or 4).
    pub addr_size: u8,
    /// Extra zero dummy bytes inserted after the address on every framed
    /// command (usually 0).
    pub addr_dummy_size: u8,
    /// Address byte order.
    pub addr_endian: AddressEndian,
    /// Nominal operation timings.
    pub timing: Timing,
}
