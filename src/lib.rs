//! Portable operation engine for SPI-attached NOR flash.
//!
//! Serializes logical flash operations — read, page-program, erase, status
//! and identification access — into framed SPI transactions against any
//! `embedded-hal` 1.0 [`embedded_hal::spi::SpiDevice`], choosing erase block
//! sizes and page-program chunking to match the geometry described by a
//! [`config::ChipConfig`] and [`command::CommandTable`].
//!
//! Two equivalent front ends share the same framing and planning logic:
//!
//! - [`blocking::Flash`] — synchronous, for [`embedded_hal::spi::SpiDevice`].
//! - [`asynch::AsyncFlash`] — `async`, for
//!   [`embedded_hal_async::spi::SpiDevice`].
#![no_std]

pub mod asynch;
pub mod blocking;
pub mod command;
pub mod config;
pub mod error;
pub mod identification;
mod planner;

pub use asynch::AsyncFlash;
pub use blocking::Flash;
pub use command::CommandTable;
pub use config::{AddressEndian, ChipConfig, Timing};
pub use error::Error;
pub use identification::Identification;
