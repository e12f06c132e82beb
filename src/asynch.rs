//! Async front end: the same engine as [`crate::blocking`], driven with
//! `async`/`.await` against a non-blocking transport instead of a blocking
//! one.
//!
//! A suspended `.await` point plays the role a saved continuation would in
//! a callback-driven design: the executor's `Waker` resumes the call
//! exactly where it left off, so there is no separate trigger function to
//! call back into (see DESIGN.md for the background on this choice).

use core::fmt::Debug;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::{Operation, SpiDevice};

use crate::command::CommandTable;
use crate::config::ChipConfig;
use crate::error::Error;
use crate::identification::Identification;
use crate::planner;

/// Async driver for a SPI-attached NOR flash described by a [`ChipConfig`]
/// and [`CommandTable`].
pub struct AsyncFlash<SPI, D> {
    spi: SPI,
    delay: D,
    cfg: ChipConfig,
    cmd: CommandTable,
}

impl<SPI, D> Debug for AsyncFlash<SPI, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AsyncFlash").finish_non_exhaustive()
    }
}

impl<SPI, D> AsyncFlash<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    /// See [`crate::blocking::Flash::init`].
    pub async fn init(
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
        let sr = this.read_sr().await?;
        if sr & this.cmd.sr_busy_bit != 0 {
            return Err(Error::HwBusy);
        }
        defmt::debug!("async spi flash init, status 0x{:02x}", sr);
        Ok(this)
    }

    /// See [`crate::blocking::Flash::is_busy`].
    pub fn is_busy(&self) -> Result<(), Error<SPI::Error>> {
        Ok(())
    }

    /// See [`crate::blocking::Flash::read`].
    pub async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        let mut frame = [0u8; 16];
        let n = self.addr_frame(&mut frame, self.cmd.read_data, addr, 0);
        self.spi
            .transaction(&mut [Operation::Write(&frame[..n]), Operation::Read(buf)])
            .await
            .map_err(Error::Transport)
    }

    /// See [`crate::blocking::Flash::fast_read`].
    pub async fn fast_read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        if self.cmd.read_data_fast == 0 {
            return self.read(addr, buf).await;
        }
        let mut frame = [0u8; 16];
        let n = self.addr_frame(&mut frame, self.cmd.read_data_fast, addr, 1);
        self.spi
            .transaction(&mut [Operation::Write(&frame[..n]), Operation::Read(buf)])
            .await
            .map_err(Error::Transport)
    }

    /// See [`crate::blocking::Flash::write`].
    pub async fn write(&mut self, mut addr: u32, mut data: &[u8]) -> Result<(), Error<SPI::Error>> {
        while !data.is_empty() {
            let chunk_len = planner::page_chunk(addr, data.len() as u32, self.cfg.page_size) as usize;
            let (chunk, rest) = data.split_at(chunk_len);

            self.write_enable().await?;
            let mut frame = [0u8; 16];
            let n = self.addr_frame(&mut frame, self.cmd.page_program, addr, 0);
            self.spi
                .transaction(&mut [Operation::Write(&frame[..n]), Operation::Write(chunk)])
                .await
                .map_err(Error::Transport)?;
            self.wait_until_ready(self.cfg.timing.page_program_ms).await?;

            addr += chunk_len as u32;
            data = rest;
        }
        Ok(())
    }

    /// See [`crate::blocking::Flash::erase`].
    pub async fn erase(&mut self, mut addr: u32, mut len: u32) -> Result<(), Error<SPI::Error>> {
        let smallest = planner::smallest_erase_size(&self.cmd).ok_or(Error::BadConfig)?;
        if len % smallest != 0 || planner::plan_erase_step(addr, len, &self.cmd).is_none() {
            return Err(Error::ErasureUnaligned);
        }
        while len > 0 {
            // The up-front check above guarantees a block fits at every step;
            // `None` here would mean the command table is inconsistent.
            let (size, opcode) =
                planner::plan_erase_step(addr, len, &self.cmd).ok_or(Error::BadConfig)?;

            self.write_enable().await?;
            let mut frame = [0u8; 16];
            let n = self.addr_frame(&mut frame, opcode, addr, 0);
            self.spi
                .transaction(&mut [Operation::Write(&frame[..n])])
                .await
                .map_err(Error::Transport)?;
            self.wait_until_ready(self.cfg.timing.erase_ms(size)).await?;

            addr += size;
            len -= size;
        }
        Ok(())
    }

    /// See [`crate::blocking::Flash::chip_erase`].
    pub async fn chip_erase(&mut self) -> Result<(), Error<SPI::Error>> {
        self.write_enable().await?;
        self.command(&[self.cmd.chip_erase]).await?;
        self.wait_until_ready(self.cfg.timing.chip_erase_ms).await
    }

    /// See [`crate::blocking::Flash::read_sr`].
    pub async fn read_sr(&mut self) -> Result<u8, Error<SPI::Error>> {
        let mut sr = [0u8; 1];
        self.spi
            .transaction(&mut [
                Operation::Write(&[self.cmd.read_sr]),
                Operation::Read(&mut sr),
            ])
            .await
            .map_err(Error::Transport)?;
        Ok(sr[0])
    }

    /// See [`crate::blocking::Flash::read_sr_busy`].
    pub async fn read_sr_busy(&mut self) -> Result<bool, Error<SPI::Error>> {
        Ok(self.read_sr().await? & self.cmd.sr_busy_bit != 0)
    }

    /// See [`crate::blocking::Flash::write_sr`].
    pub async fn write_sr(&mut self, sr: u8) -> Result<(), Error<SPI::Error>> {
        self.write_enable().await?;
        self.command(&[self.cmd.write_sr, sr]).await?;
        self.wait_until_ready(self.cfg.timing.sr_write_ms).await
    }

    /// See [`crate::blocking::Flash::write_disable`].
    pub async fn write_disable(&mut self) -> Result<(), Error<SPI::Error>> {
        self.command(&[self.cmd.write_disable]).await
    }

    /// See [`crate::blocking::Flash::read_jedec_id`].
    pub async fn read_jedec_id(&mut self) -> Result<Identification, Error<SPI::Error>> {
        self.read_id(self.cmd.jedec_id).await
    }

    /// See [`crate::blocking::Flash::read_product_id`].
    pub async fn read_product_id(&mut self) -> Result<Identification, Error<SPI::Error>> {
        self.read_id(self.cmd.device_id).await
    }

    /// See [`crate::blocking::Flash::read_reg`].
    pub async fn read_reg(&mut self, reg: u8) -> Result<u8, Error<SPI::Error>> {
        let mut data = [0u8; 1];
        self.spi
            .transaction(&mut [Operation::Write(&[reg]), Operation::Read(&mut data)])
            .await
            .map_err(Error::Transport)?;
        Ok(data[0])
    }

    /// See [`crate::blocking::Flash::write_reg`].
    pub async fn write_reg(
        &mut self,
        reg: u8,
        data: u8,
        write_en: bool,
        wait_ms: u32,
    ) -> Result<(), Error<SPI::Error>> {
        if write_en {
            self.write_enable().await?;
        }
        self.command(&[reg, data]).await?;
        if write_en {
            self.wait_until_ready(wait_ms).await?;
        }
        Ok(())
    }

    async fn read_id(&mut self, opcode: u8) -> Result<Identification, Error<SPI::Error>> {
        let mut raw = [0u8; 3];
        self.spi
            .transaction(&mut [Operation::Write(&[opcode]), Operation::Read(&mut raw)])
            .await
            .map_err(Error::Transport)?;
        Ok(Identification::from_bytes(raw))
    }

    async fn write_enable(&mut self) -> Result<(), Error<SPI::Error>> {
        self.command(&[self.cmd.write_enable]).await
    }

    async fn command(&mut self, bytes: &[u8]) -> Result<(), Error<SPI::Error>> {
        self.spi
            .transaction(&mut [Operation::Write(bytes)])
            .await
            .map_err(Error::Transport)
    }

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

    async fn wait_until_ready(&mut self, initial_ms: u32) -> Result<(), Error<SPI::Error>> {
        if initial_ms == 0 {
            return Ok(());
        }
        let mut wait_ms = initial_ms;
        loop {
            self.delay.delay_ms(wait_ms).await;
            if !self.read_sr_busy().await? {
                return Ok(());
            }
            wait_ms = core::cmp::max(1, wait_ms / 2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::future::Future;
    use core::pin::Pin;
    use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
    use embedded_hal_async::spi::ErrorType;

    /// Every mock operation here completes without ever returning `Pending`,
    /// so a single poll always drains the future; this is not a general
    /// executor.
    fn block_on<F: Future>(mut fut: F) -> F::Output {
        const VTABLE: RawWakerVTable = RawWakerVTable::new(|_| RAW, |_| {}, |_| {}, |_| {});
        const RAW: RawWaker = RawWaker::new(core::ptr::null(), &VTABLE);
        let waker = unsafe { Waker::from_raw(RAW) };
        let mut cx = Context::from_waker(&waker);
        // SAFETY: `fut` is never moved after this point.
        let mut fut = unsafe { Pin::new_unchecked(&mut fut) };
        loop {
            if let Poll::Ready(out) = fut.as_mut().poll(&mut cx) {
                return out;
            }
        }
    }

    #[derive(Debug)]
    struct MockError;
    impl embedded_hal_async::spi::Error for MockError {
        fn kind(&self) -> embedded_hal_async::spi::ErrorKind {
            embedded_hal_async::spi::ErrorKind::Other
        }
    }

    struct MockSpi {
        writes: [[u8; 16]; 8],
        write_lens: [usize; 8],
        write_count: usize,
        reads: [u8; 16],
        read_pos: usize,
    }

    impl MockSpi {
        fn new(reads: &[u8]) -> Self {
            let mut buf = [0u8; 16];
            buf[..reads.len()].copy_from_slice(reads);
            Self {
                writes: [[0u8; 16]; 8],
                write_lens: [0; 8],
                write_count: 0,
                reads: buf,
                read_pos: 0,
            }
        }

        fn nth_write(&self, n: usize) -> &[u8] {
            &self.writes[n][..self.write_lens[n]]
        }
    }

    impl ErrorType for MockSpi {
        type Error = MockError;
    }

    impl SpiDevice for MockSpi {
        async fn transaction(&mut self, ops: &mut [Operation<'_, u8>]) -> Result<(), MockError> {
            let idx = self.write_count;
            let mut len = 0usize;
            for op in ops {
                match op {
                    Operation::Write(buf) => {
                        self.writes[idx][len..len + buf.len()].copy_from_slice(buf);
                        len += buf.len();
                    }
                    Operation::Read(buf) => {
                        for b in buf.iter_mut() {
                            *b = self.reads[self.read_pos];
                            self.read_pos += 1;
                        }
                    }
                    _ => unreachable!("test driver only issues Write/Read operations"),
                }
            }
            self.write_lens[idx] = len;
            self.write_count += 1;
            Ok(())
        }
    }

    struct MockDelay;
    impl DelayNs for MockDelay {
        async fn delay_ns(&mut self, _ns: u32) {}
    }

    fn cfg() -> ChipConfig {
        ChipConfig {
            size: 16 * 1024 * 1024,
            page_size: 256,
            addr_size: 3,
            addr_dummy_size: 0,
            addr_endian: crate::config::AddressEndian::Big,
            timing: crate::config::Timing {
                sr_write_ms: 15,
                page_program_ms: 3,
                block_erase_4_ms: 400,
                block_erase_8_ms: 0,
                block_erase_16_ms: 0,
                block_erase_32_ms: 1600,
                block_erase_64_ms: 2000,
                chip_erase_ms: 25_000,
            },
        }
    }

    #[test]
    fn init_rejects_when_already_busy() {
        let spi = MockSpi::new(&[0x01]);
        let err = block_on(AsyncFlash::init(spi, MockDelay, cfg(), CommandTable::STANDARD)).unwrap_err();
        assert!(matches!(err, Error::HwBusy));
    }

    #[test]
    fn write_splits_at_page_boundary_with_write_enable_per_chunk() {
        let spi = MockSpi::new(&[0x00]);
        let mut flash =
            block_on(AsyncFlash::init(spi, MockDelay, cfg(), CommandTable::STANDARD)).unwrap();
        let data = [0x5Au8; 20];
        block_on(flash.write(0x1F0, &data)).unwrap();

        assert_eq!(flash.spi.nth_write(1), &[0x06]);
        assert_eq!(flash.spi.nth_write(2), &[0x02, 0x00, 0x01, 0xF0]);
        assert_eq!(flash.spi.nth_write(3), &[0x06]);
        assert_eq!(flash.spi.nth_write(4), &[0x02, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn erase_rejects_misaligned_start_address_up_front() {
        let spi = MockSpi::new(&[0x00]);
        let mut flash =
            block_on(AsyncFlash::init(spi, MockDelay, cfg(), CommandTable::STANDARD)).unwrap();
        let err = block_on(flash.erase(0x800, 0x1000)).unwrap_err();
        assert!(matches!(err, Error::ErasureUnaligned));
        assert_eq!(flash.spi.write_count, 1);
    }
}
