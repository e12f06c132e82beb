use core::fmt::{self, Debug};
use defmt::{Format, Formatter};

/// The error type used by this library.
///
/// Wraps the transport's own error type and adds the operation engine's
/// protocol-level error taxonomy on top of it.
pub enum Error<E> {
    /// The underlying SPI transaction or delay failed.
    Transport(E),
    /// A request arrived while another operation was still in flight.
    ///
    /// Unreachable through this crate's public API: every call here runs
    /// its operation to completion (or is a single `&mut self` future a
    /// caller cannot poll twice), so the borrow checker already rules out
    /// concurrent entry. Kept for parity with the engine's error taxonomy.
    BusyDriver,
    /// `init` observed the busy bit already set, before issuing any command.
    HwBusy,
    /// An erase length was not a multiple of the smallest supported erase
    /// block.
    ErasureUnaligned,
    /// The erase planner chose a block size whose opcode is absent from the
    /// command table. Indicates an inconsistent `CommandTable`.
    BadConfig,
}

impl<E> Format for Error<E>
where
    E: Debug,
{
    fn format(&self, fmt: Formatter) {
        match self {
            Error::Transport(_e) => defmt::write!(fmt, "Error::Transport"),
            Error::BusyDriver => defmt::write!(fmt, "Error::BusyDriver"),
            Error::HwBusy => defmt::write!(fmt, "Error::HwBusy"),
            Error::ErasureUnaligned => defmt::write!(fmt, "Error::ErasureUnaligned"),
            Error::BadConfig => defmt::write!(fmt, "Error::BadConfig"),
        }
    }
}

impl<E> Debug for Error<E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "Error::Transport({:?})", e),
            Error::BusyDriver => write!(f, "Error::BusyDriver"),
            Error::HwBusy => write!(f, "Error::HwBusy"),
            Error::ErasureUnaligned => write!(f, "Error::ErasureUnaligned"),
            Error::BadConfig => write!(f, "Error::BadConfig"),
        }
    }
}
