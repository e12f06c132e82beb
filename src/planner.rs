//! Pure planning helpers for address framing, page splitting, and erase
//! block selection.
//!
//! These carry no transport dependency, so the arithmetic they implement —
//! page splitting, erase-block optimality, address endianness — is tested
//! directly against them below, without a mock SPI bus.

use crate::command::CommandTable;
use crate::config::{AddressEndian, ChipConfig};

/// Writes `addr` into `buf` in the configured endianness, returning the
/// number of bytes written (`cfg.addr_size`).
///
/// Big-endian emits the MSB first; little-endian the LSB first. Address
/// bits beyond `addr_size * 8` are truncated.
pub(crate) fn encode_address(buf: &mut [u8], addr: u32, cfg: &ChipConfig) -> usize {
    let n = cfg.addr_size as usize;
    match cfg.addr_endian {
        AddressEndian::Big => {
            for i in 0..n {
                buf[i] = (addr >> (8 * (n - 1 - i))) as u8;
            }
        }
        AddressEndian::Little => {
            for i in 0..n {
                buf[i] = (addr >> (8 * i)) as u8;
            }
        }
    }
    n
}

/// Size of the next page-program chunk starting at `addr`, never crossing a
/// page boundary:
///
/// `rem_pg_sz = page_sz − (addr mod page_sz)`, `chunk = min(remaining,
/// rem_pg_sz)`.
pub(crate) fn page_chunk(addr: u32, remaining: u32, page_size: u32) -> u32 {
    let rem_pg_sz = page_size - (addr % page_size);
    remaining.min(rem_pg_sz)
}

/// The smallest erase block size this command table supports, if any.
pub(crate) fn smallest_erase_size(cmd: &CommandTable) -> Option<u32> {
    cmd.erase_sizes()
        .into_iter()
        .filter(|(_, opcode)| *opcode != 0)
        .map(|(size, _)| size)
        .min()
}

/// Chooses the largest supported erase block that is naturally aligned to
/// `addr` and does not exceed `len`.
///
/// `addr == 0` is aligned to every size, since any modulus of zero is zero
/// — no special case needed.
///
/// Returns `(size_bytes, opcode)` of the winning block, or `None` if no
/// supported size fits the current `(addr, len)`; callers decide what that
/// means (nothing fits the requested range at all, vs. an inconsistent
/// command table encountered mid-plan).
pub(crate) fn plan_erase_step(addr: u32, len: u32, cmd: &CommandTable) -> Option<(u32, u8)> {
    cmd.erase_sizes()
        .into_iter()
        .filter(|(size, opcode)| *opcode != 0 && addr % size == 0 && len >= *size)
        .max_by_key(|(size, _)| *size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(endian: AddressEndian) -> ChipConfig {
        ChipConfig {
            size: 16 * 1024 * 1024,
            page_size: 256,
            addr_size: 3,
            addr_dummy_size: 0,
            addr_endian: endian,
            timing: Default::default(),
        }
    }

    #[test]
    fn address_encoding_big_endian() {
        let mut buf = [0u8; 4];
        let n = encode_address(&mut buf, 0x0102_0304, &cfg(AddressEndian::Big));
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn address_encoding_little_endian() {
        let mut buf = [0u8; 4];
        let n = encode_address(&mut buf, 0x0102_0304, &cfg(AddressEndian::Little));
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], &[0x04, 0x03, 0x02]);
    }

    #[test]
    fn page_chunk_splits_at_boundary() {
        // 300 bytes starting at 0x180 inside a 256-byte page: first chunk
        // reaches the 0x200 boundary (128 bytes), second takes the rest.
        let first = page_chunk(0x180, 300, 256);
        assert_eq!(first, 128);
        let second = page_chunk(0x180 + first, 300 - first, 256);
        assert_eq!(second, 172);
        assert_eq!(first + second, 300);
    }

    #[test]
    fn page_chunk_whole_write_fits_one_page() {
        let chunk = page_chunk(0x1000, 10, 256);
        assert_eq!(chunk, 10);
    }

    #[test]
    fn erase_plan_picks_largest_aligned_size() {
        let cmd = CommandTable::STANDARD; // 4K/32K/64K supported, not 8K/16K
        let expected = [
            (64 * 1024, 0xD8u8),
            (4 * 1024, 0x20),
            (4 * 1024, 0x20),
            (4 * 1024, 0x20),
            (4 * 1024, 0x20),
        ];
        let mut addr = 0u32;
        let mut len = 0x14000u32; // 80 KiB = 64K + 4*4K
        for want in expected {
            let got = plan_erase_step(addr, len, &cmd).expect("plan exists");
            assert_eq!(got, want);
            addr += got.0;
            len -= got.0;
        }
        assert_eq!(len, 0);
    }

    #[test]
    fn erase_plan_addr_zero_is_aligned_to_every_size() {
        let cmd = CommandTable::STANDARD;
        let (size, _) = plan_erase_step(0, 64 * 1024, &cmd).expect("plan exists");
        assert_eq!(size, 64 * 1024);
    }

    #[test]
    fn erase_plan_none_fits_when_addr_misaligned() {
        // addr=4K is not a multiple of 32K or 64K, and len is below those
        // anyway, so only the 4K step can be chosen here.
        let cmd = CommandTable::STANDARD;
        let (size, opcode) = plan_erase_step(4 * 1024, 4 * 1024, &cmd).expect("plan exists");
        assert_eq!((size, opcode), (4 * 1024, 0x20));
    }

    #[test]
    fn smallest_erase_size_skips_unsupported_granularities() {
        assert_eq!(smallest_erase_size(&CommandTable::STANDARD), Some(4 * 1024));
    }
}
