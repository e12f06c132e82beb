use core::fmt;

/// 3-byte JEDEC manufacturer/device identifier, as returned by
/// `read_jedec_id` / `read_product_id`.
///
/// Unlike a generic JEDEC ID reader, this engine always reads a fixed
/// 3-byte response after the opcode and does not chase `0x7F` continuation
/// codes across a longer buffer — the manufacturer code is always
/// `raw()[0]`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Identification {
    bytes: [u8; 3],
}

impl Identification {
    pub(crate) fn from_bytes(bytes: [u8; 3]) -> Self {
        Self { bytes }
    }

    /// The manufacturer code (JEDEC Publication 106AJ or similar).
    pub fn mfr_code(&self) -> u8 {
        self.bytes[0]
    }

    /// The manufacturer-specific device ID.
    pub fn device_id(&self) -> [u8; 2] {
        [self.bytes[1], self.bytes[2]]
    }

    /// The 3 raw bytes as read off the wire.
    pub fn raw(&self) -> [u8; 3] {
        self.bytes
    }
}

impl fmt::Debug for Identification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identification")
            .field("mfr_code", &self.bytes[0])
            .field("device_id", &[self.bytes[1], self.bytes[2]])
            .finish()
    }
}

impl defmt::Format for Identification {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "Identification {{ mfr_code: {=u8:#04x}, device_id: [{=u8:#04x}, {=u8:#04x}] }}",
            self.bytes[0],
            self.bytes[1],
            self.bytes[2]
        )
    }
}
