use crate::config::SpiConfig;
use crate::pins::{I2cPins, PinId, PinRole, SpiPins};

/// Bus conditions around one chunk of an I2C transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Send a start (or repeated start) and the address before the chunk.
    pub start: bool,
    /// Send a stop after the chunk.
    pub stop: bool,
}

impl Frame {
    /// A chunk with the given start and stop conditions.
    pub const fn new(start: bool, stop: bool) -> Self {
        Self { start, stop }
    }
}

/// Chip-level I2C driver underneath an [`I2c`](crate::I2c) handle.
///
/// Implementors own the peripheral registers and perform the electrical
/// transfer. The handle validates locking, addresses and buffer ranges
/// before any of these methods is called.
pub trait I2cHal {
    /// Error type for failed transfers.
    type Error: core::fmt::Debug;

    /// Whether `pin` can be routed to `role` on this peripheral.
    fn supports(&self, pin: PinId, role: PinRole) -> bool;

    /// Bind the peripheral to `pins` and start the clock at `frequency` Hz.
    ///
    /// Returns `false` if the pins cannot be used together.
    fn construct(&mut self, pins: I2cPins, frequency: u32) -> bool;

    /// Stop the peripheral and let go of its pins.
    fn deinit(&mut self);

    /// Whether a device acknowledges `address`.
    fn probe(&mut self, address: u8) -> bool;

    /// Read `buffer.len()` bytes from `address` and end the transaction.
    ///
    /// If the previous write left the transaction open this continues it
    /// with a repeated start.
    fn read(
        &mut self,
        address: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.read_framed(address, buffer, Frame::new(true, true))
    }

    /// Write `buffer` to `address`, sending a stop condition if `stop`.
    fn write(
        &mut self,
        address: u8,
        buffer: &[u8],
        stop: bool,
    ) -> Result<(), Self::Error> {
        self.write_framed(address, buffer, Frame::new(true, stop))
    }

    /// Read one chunk of a multi-operation transaction.
    ///
    /// With `frame.start` false the bytes continue the previous chunk's read
    /// with no start condition or address in between. That is only asked
    /// for directly after another read chunk.
    fn read_framed(
        &mut self,
        address: u8,
        buffer: &mut [u8],
        frame: Frame,
    ) -> Result<(), Self::Error>;

    /// Write one chunk of a multi-operation transaction.
    ///
    /// With `frame.start` false the bytes continue the previous chunk's write
    /// with no start condition or address in between. That is only asked
    /// for directly after another write chunk.
    fn write_framed(
        &mut self,
        address: u8,
        buffer: &[u8],
        frame: Frame,
    ) -> Result<(), Self::Error>;
}

/// Chip-level SPI driver underneath a [`Spi`](crate::Spi) handle.
pub trait SpiHal {
    /// Error type for failed transfers and configuration changes.
    type Error: core::fmt::Debug;

    /// Whether `pin` can be routed to `role` on this peripheral.
    fn supports(&self, pin: PinId, role: PinRole) -> bool;

    /// Bind the peripheral to `pins` with the default configuration.
    ///
    /// Returns `false` if the pins cannot be used together.
    fn construct(&mut self, pins: SpiPins) -> bool;

    /// Stop the peripheral and let go of its pins.
    fn deinit(&mut self);

    /// Apply a new clock rate, mode and word width.
    fn configure(&mut self, config: &SpiConfig) -> Result<(), Self::Error>;

    /// Clock in `buffer.len()` words while sending `fill` on MOSI.
    fn read(&mut self, buffer: &mut [u8], fill: u8) -> Result<(), Self::Error>;

    /// Clock out `buffer`, discarding whatever arrives on MISO.
    fn write(&mut self, buffer: &[u8]) -> Result<(), Self::Error>;

    /// Full-duplex transfer of equally sized buffers.
    fn transfer(
        &mut self,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error>;
}
