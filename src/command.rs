//! Per-chip opcode table.
//!
//! Mirrors the `spiflash_cmd_tbl_t` struct from the original driver this
//! crate generalizes: one opcode field per supported instruction. A field
//! set to `0x00` means "not supported by this chip" — the engine adapts
//! (fast-read falls back to plain read, unsupported erase granularities are
//! skipped by the erase planner).

/// Opcodes and busy-bit mask for one flash part.
///
/// Values are found in the part's datasheet. Set a field to `0x00` if the
/// chip does not support that instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTable {
    /// Clear the write enable latch.
    pub write_disable: u8,
    /// Set the write enable latch. Required before every program, erase, or
    /// status-register write.
    pub write_enable: u8,

    /// Page Program — writes up to one page at previously erased locations.
    pub page_program: u8,
    /// Read Data — no dummy cycles.
    pub read_data: u8,
    /// Fast Read — one extra dummy byte, higher clock rate.
    pub read_data_fast: u8,

    /// Write Status Register.
    pub write_sr: u8,
    /// Read Status Register.
    pub read_sr: u8,

    /// 4 KiB sector erase.
    pub block_erase_4: u8,
    /// 8 KiB block erase.
    pub block_erase_8: u8,
    /// 16 KiB block erase.
    pub block_erase_16: u8,
    /// 32 KiB block erase.
    pub block_erase_32: u8,
    /// 64 KiB block erase.
    pub block_erase_64: u8,
    /// Whole-chip erase.
    pub chip_erase: u8,

    /// Read manufacturer/device ("product") ID.
    pub device_id: u8,
    /// Read JEDEC ID.
    pub jedec_id: u8,

    /// Mask selecting the busy bit within the status register byte.
    pub sr_busy_bit: u8,
}

impl CommandTable {
    /// Conventional Winbond/SPI-NOR opcodes, as found on the vast majority
    /// of 25-series parts.
    pub const STANDARD: CommandTable = CommandTable {
        write_disable: 0x04,
        write_enable: 0x06,
        page_program: 0x02,
        read_data: 0x03,
        read_data_fast: 0x0B,
        write_sr: 0x01,
        read_sr: 0x05,
        block_erase_4: 0x20,
        block_erase_8: 0x00,
        block_erase_16: 0x00,
        block_erase_32: 0x52,
        block_erase_64: 0xD8,
        chip_erase: 0xC7,
        device_id: 0x90,
        jedec_id: 0x9F,
        sr_busy_bit: 0x01,
    };

    /// The five `(size_bytes, opcode)` erase granularities, in ascending
    /// order, with `opcode == 0` where the chip doesn't support that size.
    pub(crate) fn erase_sizes(&self) -> [(u32, u8); 5] {
        [
            (4 * 1024, self.block_erase_4),
            (8 * 1024, self.block_erase_8),
            (16 * 1024, self.block_erase_16),
            (32 * 1024, self.block_erase_32),
            (64 * 1024, self.block_erase_64),
        ]
    }
}
