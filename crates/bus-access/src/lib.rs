#![no_std]
//! Lock-guarded access to I2C and SPI buses shared by several consumers.
//!
//! A bus handle ([`I2c`] or [`Spi`]) owns its pins and its HAL driver for its
//! whole life. Consumers share the handle by reference, take the advisory
//! lock with `try_lock`, run their transfers and `unlock`. Transfers attempted
//! without the lock fail with [`Error::PermissionDenied`] before the HAL is
//! called, so two consumers can never interleave bytes on the wire.
//!
//! I2C transfers operate on a [`Span`] of the caller's buffer, which is
//! passed to the HAL as a borrowed sub-slice rather than a copy.

mod config;
mod error;
mod hal;
mod i2c;
mod lock;
mod pins;
mod span;
mod spi;

pub use config::{I2cConfig, SpiConfig, SpiSettings};
pub use error::{ArgumentError, Error, PinError};
pub use hal::{Frame, I2cHal, SpiHal};
pub use i2c::{I2c, I2cGuard, ScanResult, SCAN_FIRST, SCAN_LAST};
pub use lock::{BusLock, LockState};
pub use pins::{I2cPins, PinId, PinRegistry, PinRole, SpiPins};
pub use span::Span;
pub use spi::{Spi, SpiGuard, READ_FILL};
