//! Blocking front end: the operation engine driven synchronously, one
//! `SpiDevice::transaction` call per framed command.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};

use crate::command::CommandTable;
use crate::config::ChipConfig;
use crate::error::Error;
use crate::identification::Identification;
use crate::planner;

/// Blocking driver for a SPI-attached NOR flash described by a
/// [`ChipConfig`] and [`CommandTable`].
pub struct Flash<SPI, D> {
    spi: SPI,
    delay: D,
    cfg: ChipConfig,
    cmd: CommandTable,
}

impl<SPI, D> Debug for Flash<SPI, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Flash").finish_non_exhaustive()
    }
}

impl<SPI, D> Flash<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    /// Takes ownership of the transport and performs a one-time busy
    /// pre-check: if the chip is already mid-operation from before this
    /// driver instance existed (e.g. an MCU reset across an erase), `init`
    /// fails fast with [`Error::HwBusy`] instead of spinning.
    pub fn init(
        spi: SPI,
        delay: D,
        cfg: ChipConfig,
        cmd: CommandTable,
    ) -> Result<Self, Error<SPI::Error>> {
        let mut this = Self {
            spi,
            delay,
            cfg,
            cmd,
        };
        let sr = this.read_sr()?;
        if sr & this.cmd.sr_busy_bit != 0 {
            return Err(Error::HwBusy);
        }
        defmt::debug!("spi flash init, status 0x{:02x}", sr);
        Ok(this)
    }

    /// Performs no I/O; every call on this type already runs its operation
    /// to completion, so the driver is always idle when it is reachable.
    pub fn is_busy(&self) -> Result<(), Error<SPI::Error>> {
        Ok(())
    }

    /// Reads flash contents into `buf`, starting at `addr`.
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        let mut frame = [0u8; 16];
        let n = self.addr_frame(&mut frame, self.cmd.read_data, addr, 0);
        self.spi
            .transaction(&mut [Operation::Write(&frame[..n]), Operation::Read(buf)])
            .map_err(Error::Transport)
    }

    /// Fast read if the chip supports it, else a transparent fallback to
    /// plain read: identical wire trace when `read_data_fast == 0`.
    pub fn fast_read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        if self.cmd.read_data_fast == 0 {
            return self.read(addr, buf);
        }
        let mut frame = [0u8; 16];
        // one mandatory dummy byte beyond addr_dummy_size.
        let n = self.addr_frame(&mut frame, self.cmd.read_data_fast, addr, 1);
        self.spi
            .transaction(&mut [Operation::Write(&frame[..n]), Operation::Read(buf)])
            .map_err(Error::Transport)
    }

    /// Programs `data` starting at `addr`, splitting at page boundaries and
    /// re-issuing write-enable before every chunk, since the chip clears
    /// its write-enable latch after each page program.
    ///
    /// Pre-erasing the target range is the caller's responsibility.
    pub fn write(&mut self, mut addr: u32, mut data: &[u8]) -> Result<(), Error<SPI::Error>> {
        while !data.is_empty() {
            let chunk_len = planner::page_chunk(addr, data.len() as u32, self.cfg.page_size) as usize;
            let (chunk, rest) = data.split_at(chunk_len);

            self.write_enable()?;
            let mut frame = [0u8; 16];
            let n = self.addr_frame(&mut frame, self.cmd.page_program, addr, 0);
            self.spi
                .transaction(&mut [Operation::Write(&frame[..n]), Operation::Write(chunk)])
                .map_err(Error::Transport)?;
            self.wait_until_ready(self.cfg.timing.page_program_ms)?;

            addr += chunk_len as u32;
            data = rest;
        }
        Ok(())
    }

    /// Erases `[addr, addr + len)`, greedily choosing the largest supported
    /// erase block naturally aligned to the current address.
    ///
    /// Rejected up front with [`Error::ErasureUnaligned`] if no supported
    /// block size can start the range at all — whether because `len` isn't
    /// a multiple of the smallest supported block, or because `addr` isn't
    /// aligned to any block size that fits within `len`.
    pub fn erase(&mut self, mut addr: u32, mut len: u32) -> Result<(), Error<SPI::Error>> {
        let smallest = planner::smallest_erase_size(&self.cmd).ok_or(Error::BadConfig)?;
        if len % smallest != 0 || planner::plan_erase_step(addr, len, &self.cmd).is_none() {
            return Err(Error::ErasureUnaligned);
        }
        while len > 0 {
            // The up-front check above guarantees a block fits at every step;
            // `None` here would mean the command table is inconsistent.
            let (size, opcode) =
                planner::plan_erase_step(addr, len, &self.cmd).ok_or(Error::BadConfig)?;

            self.write_enable()?;
            let mut frame = [0u8; 16];
            let n = self.addr_frame(&mut frame, opcode, addr, 0);
            self.spi
                .transaction(&mut [Operation::Write(&frame[..n])])
                .map_err(Error::Transport)?;
            self.wait_until_ready(self.cfg.timing.erase_ms(size))?;

            addr += size;
            len -= size;
        }
        Ok(())
    }

    /// Erases the whole chip.
    pub fn chip_erase(&mut self) -> Result<(), Error<SPI::Error>> {
        self.write_enable()?;
        self.command(&[self.cmd.chip_erase])?;
        self.wait_until_ready(self.cfg.timing.chip_erase_ms)
    }

    /// Reads the raw status register byte.
    pub fn read_sr(&mut self) -> Result<u8, Error<SPI::Error>> {
        let mut sr = [0u8; 1];
        self.spi
            .transaction(&mut [
                Operation::Write(&[self.cmd.read_sr]),
                Operation::Read(&mut sr),
            ])
            .map_err(Error::Transport)?;
        Ok(sr[0])
    }

    /// Reads the status register and reports whether the busy bit is set.
    pub fn read_sr_busy(&mut self) -> Result<bool, Error<SPI::Error>> {
        Ok(self.read_sr()? & self.cmd.sr_busy_bit != 0)
    }

    /// Writes the status register (preceded by write-enable).
    pub fn write_sr(&mut self, sr: u8) -> Result<(), Error<SPI::Error>> {
        self.write_enable()?;
        self.command(&[self.cmd.write_sr, sr])?;
        self.wait_until_ready(self.cfg.timing.sr_write_ms)
    }

    /// Clears the write-enable latch.
    pub fn write_disable(&mut self) -> Result<(), Error<SPI::Error>> {
        self.command(&[self.cmd.write_disable])
    }

    /// Reads the JEDEC manufacturer/device identification.
    pub fn read_jedec_id(&mut self) -> Result<Identification, Error<SPI::Error>> {
        self.read_id(self.cmd.jedec_id)
    }

    /// Reads the manufacturer/product identification.
    pub fn read_product_id(&mut self) -> Result<Identification, Error<SPI::Error>> {
        self.read_id(self.cmd.device_id)
    }

    /// Reads a single arbitrary hardware register.
    pub fn read_reg(&mut self, reg: u8) -> Result<u8, Error<SPI::Error>> {
        let mut data = [0u8; 1];
        self.spi
            .transaction(&mut [Operation::Write(&[reg]), Operation::Read(&mut data)])
            .map_err(Error::Transport)?;
        Ok(data[0])
    }

    /// Writes a single arbitrary hardware register.
    ///
    /// If `write_en`, a write-enable is issued first and the engine busy-
    /// waits for `wait_ms` (the initial nominal wait before the first
    /// status-register poll) before returning.
    pub fn write_reg(
        &mut self,
        reg: u8,
        data: u8,
        write_en: bool,
        wait_ms: u32,
    ) -> Result<(), Error<SPI::Error>> {
        if write_en {
            self.write_enable()?;
        }
        self.command(&[reg, data])?;
        if write_en {
            self.wait_until_ready(wait_ms)?;
        }
        Ok(())
    }

    fn read_id(&mut self, opcode: u8) -> Result<Identification, Error<SPI::Error>> {
        let mut raw = [0u8; 3];
        self.spi
            .transaction(&mut [Operation::Write(&[opcode]), Operation::Read(&mut raw)])
            .map_err(Error::Transport)?;
        Ok(Identification::from_bytes(raw))
    }

    fn write_enable(&mut self) -> Result<(), Error<SPI::Error>> {
        self.command(&[self.cmd.write_enable])
    }

    fn command(&mut self, bytes: &[u8]) -> Result<(), Error<SPI::Error>> {
        self.spi
            .transaction(&mut [Operation::Write(bytes)])
            .map_err(Error::Transport)
    }

    /// Writes `opcode` then the address (in the configured endianness) plus
    /// `extra_dummy` mandatory dummy bytes and `cfg.addr_dummy_size` filler
    /// bytes into `frame`, returning the total frame length.
    fn addr_frame(&self, frame: &mut [u8; 16], opcode: u8, addr: u32, extra_dummy: usize) -> usize {
        frame[0] = opcode;
        let addr_len = planner::encode_address(&mut frame[1..], addr, &self.cfg);
        let dummy_start = 1 + addr_len;
        let dummy_len = extra_dummy + self.cfg.addr_dummy_size as usize;
        for b in &mut frame[dummy_start..dummy_start + dummy_len] {
            *b = 0x00;
        }
        dummy_start + dummy_len
    }

    /// Waits `initial_ms` (the datasheet's nominal operation time), polls
    /// SR, and if still busy halves the wait (floor 1 ms) and polls again.
    /// `initial_ms == 0` short-circuits entirely (busy GPIO wired
    /// externally).
    fn wait_until_ready(&mut self, initial_ms: u32) -> Result<(), Error<SPI::Error>> {
        if initial_ms == 0 {
            return Ok(());
        }
        let mut wait_ms = initial_ms;
        loop {
            self.delay.delay_ms(wait_ms);
            if !self.read_sr_busy()? {
                return Ok(());
            }
            wait_ms = core::cmp::max(1, wait_ms / 2);
        }
    }
}
