use embedded_hal::{i2c, spi};

use crate::pins::{PinId, PinRole};

/// Errors reported by bus handle operations.
///
/// `E` is the error type of the underlying HAL driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Pin validation failed while binding the handle.
    InvalidPin(PinError),
    /// A parameter was out of range; the HAL was not called.
    InvalidArgument(ArgumentError),
    /// The operation requires the handle lock, which the caller does not hold.
    PermissionDenied,
    /// The HAL reported a failed transfer.
    Bus(E),
    /// The HAL rejected a configuration change.
    Configuration(E),
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidPin(err) => write!(f, "Invalid pin: {}", err),
            Error::InvalidArgument(err) => {
                write!(f, "Invalid argument: {}", err)
            }
            Error::PermissionDenied => {
                write!(f, "Operation requires the bus lock")
            }
            Error::Bus(err) => write!(f, "Bus error: {:?}", err),
            Error::Configuration(err) => {
                write!(f, "Bus configuration failed: {:?}", err)
            }
        }
    }
}

impl<E> From<PinError> for Error<E> {
    fn from(e: PinError) -> Self {
        Error::InvalidPin(e)
    }
}

impl<E> From<ArgumentError> for Error<E> {
    fn from(e: ArgumentError) -> Self {
        Error::InvalidArgument(e)
    }
}

impl<E: i2c::Error> i2c::Error for Error<E> {
    fn kind(&self) -> i2c::ErrorKind {
        match self {
            Error::Bus(err) => err.kind(),
            _ => i2c::ErrorKind::Other,
        }
    }
}

impl<E: spi::Error> spi::Error for Error<E> {
    fn kind(&self) -> spi::ErrorKind {
        match self {
            Error::Bus(err) => err.kind(),
            _ => spi::ErrorKind::Other,
        }
    }
}

/// Reasons a set of pins cannot be bound to a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// The pin number is outside what the registry can track.
    OutOfRange(PinId),
    /// The same pin was passed for two lines.
    Duplicate(PinId),
    /// The pin is already owned by another handle.
    InUse(PinId),
    /// The HAL cannot route the pin to the requested role.
    Unsupported(PinId, PinRole),
    /// The HAL refused to bind the peripheral to these pins.
    Rejected,
}

impl core::fmt::Display for PinError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PinError::OutOfRange(pin) => {
                write!(f, "pin {} is out of range", pin.number())
            }
            PinError::Duplicate(pin) => {
                write!(f, "pin {} is used for more than one line", pin.number())
            }
            PinError::InUse(pin) => {
                write!(f, "pin {} is in use", pin.number())
            }
            PinError::Unsupported(pin, role) => {
                write!(f, "pin {} cannot be used as {:?}", pin.number(), role)
            }
            PinError::Rejected => write!(f, "peripheral refused the pins"),
        }
    }
}

/// Out-of-range operation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArgumentError {
    /// I2C addresses are 7 bits wide.
    Address(u8),
    /// SPI clock polarity must be 0 or 1.
    Polarity(u8),
    /// SPI clock phase must be 0 or 1.
    Phase(u8),
    /// SPI word width must be 8 or 9 bits.
    Bits(u8),
    /// Full-duplex buffers must be the same length.
    LengthMismatch { write: usize, read: usize },
    /// The handle was built without the data line this transfer needs.
    MissingLine(PinRole),
}

impl core::fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ArgumentError::Address(value) => {
                write!(f, "invalid 7-bit address: {:#04x}", value)
            }
            ArgumentError::Polarity(value) => {
                write!(f, "invalid polarity: {}", value)
            }
            ArgumentError::Phase(value) => {
                write!(f, "invalid phase: {}", value)
            }
            ArgumentError::Bits(value) => {
                write!(f, "invalid number of bits: {}", value)
            }
            ArgumentError::LengthMismatch { write, read } => {
                write!(
                    f,
                    "buffer lengths differ (write {}, read {})",
                    write, read
                )
            }
            ArgumentError::MissingLine(role) => {
                write!(f, "bus has no {:?} line", role)
            }
        }
    }
}
