use core::cell::RefCell;
use core::mem::discriminant;
use core::ops::Deref;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};
use embedded_hal::i2c as hal1;
use heapless::Vec;

use crate::config::I2cConfig;
use crate::error::{ArgumentError, Error, PinError};
use crate::hal::{Frame, I2cHal};
use crate::lock::{BusLock, LockState};
use crate::pins::{I2cPins, PinRegistry};
use crate::span::Span;

/// Lowest address probed by [`I2c::scan`]. `0b0000xxx` is reserved.
pub const SCAN_FIRST: u8 = 0x08;
/// Highest address probed by [`I2c::scan`]. `0b1111xxx` is reserved.
pub const SCAN_LAST: u8 = 0x77;

/// Addresses that answered a [`I2c::scan`], in ascending order.
pub type ScanResult = Vec<u8, { (SCAN_LAST - SCAN_FIRST + 1) as usize }>;

/// A shared I2C bus.
///
/// Consumers share the handle by reference and take turns through
/// [`try_lock`](Self::try_lock) / [`unlock`](Self::unlock). Every transfer
/// checks the lock before the HAL is touched. Dropping the handle
/// deinitializes it and returns its pins to the registry.
pub struct I2c<'r, M: RawMutex, H: I2cHal> {
    hal: Mutex<M, RefCell<H>>,
    lock: BusLock,
    registry: &'r PinRegistry,
    pins: I2cPins,
    config: I2cConfig,
}

impl<'r, M: RawMutex, H: I2cHal> I2c<'r, M, H> {
    /// Claim `pins` in `registry` and bind `hal` to them.
    ///
    /// Fails with [`Error::InvalidPin`] if the pins repeat, are taken,
    /// cannot serve their role, or are refused by the HAL. Nothing stays
    /// claimed on failure.
    pub fn new(
        mut hal: H,
        registry: &'r PinRegistry,
        pins: I2cPins,
        config: I2cConfig,
    ) -> Result<Self, Error<H::Error>> {
        for (pin, role) in pins.roles() {
            if !hal.supports(pin, role) {
                return Err(PinError::Unsupported(pin, role).into());
            }
        }

        let claimed = [pins.clock, pins.data];
        registry.claim(&claimed)?;

        if !hal.construct(pins, config.frequency) {
            registry.release(&claimed);
            #[cfg(feature = "defmt")]
            defmt::warn!("I2C peripheral refused pins {:?}", pins);
            return Err(PinError::Rejected.into());
        }

        Ok(Self {
            hal: Mutex::new(RefCell::new(hal)),
            lock: BusLock::new(),
            registry,
            pins,
            config,
        })
    }

    /// Pins this bus was constructed on.
    pub fn pins(&self) -> I2cPins {
        self.pins
    }

    /// Configuration the peripheral was started with.
    pub fn config(&self) -> I2cConfig {
        self.config
    }

    /// Try to take exclusive use of the bus. Never blocks.
    pub fn try_lock(&self) -> bool {
        self.lock.try_lock()
    }

    /// Give up exclusive use of the bus.
    pub fn unlock(&self) {
        self.lock.unlock()
    }

    /// Whether some consumer currently holds the bus.
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Current state of the bus lock, including [`LockState::Released`].
    pub fn lock_state(&self) -> LockState {
        self.lock.state()
    }

    /// Take the lock and return a guard that gives it back on drop.
    pub fn try_acquire(&self) -> Option<I2cGuard<'_, 'r, M, H>> {
        self.try_lock().then(|| I2cGuard { bus: self })
    }

    /// Probe every non-reserved 7-bit address.
    pub fn scan(&self) -> Result<ScanResult, Error<H::Error>> {
        self.check_lock()?;

        // ScanResult holds one slot per probed address.
        Ok(self.with_hal(|hal| {
            (SCAN_FIRST..=SCAN_LAST)
                .filter(|&address| hal.probe(address))
                .collect()
        }))
    }

    /// Read from `address` into the `span` of `buffer`.
    ///
    /// An empty span succeeds without touching the bus.
    pub fn read(
        &self,
        address: u8,
        buffer: &mut [u8],
        span: Span,
    ) -> Result<(), Error<H::Error>> {
        self.check_lock()?;
        check_address(address)?;

        let buffer = span.slice_mut(buffer);
        if buffer.is_empty() {
            return Ok(());
        }

        self.with_hal(|hal| hal.read(address, buffer))
            .map_err(|e| self.bus_error(address, e))
    }

    /// Write the `span` of `buffer` to `address`.
    ///
    /// With `stop` false the transaction is left open, so the next read or
    /// write continues it with a repeated start. An empty span succeeds
    /// without touching the bus.
    pub fn write(
        &self,
        address: u8,
        buffer: &[u8],
        span: Span,
        stop: bool,
    ) -> Result<(), Error<H::Error>> {
        self.check_lock()?;
        check_address(address)?;

        let buffer = span.slice(buffer);
        if buffer.is_empty() {
            return Ok(());
        }

        self.with_hal(|hal| hal.write(address, buffer, stop))
            .map_err(|e| self.bus_error(address, e))
    }

    /// Shut the peripheral down and free its pins.
    ///
    /// Allowed whether or not the bus is locked. Only the first call has an
    /// effect; afterwards the lock can no longer be taken.
    pub fn deinit(&self) {
        if !self.lock.release() {
            return;
        }
        self.with_hal(|hal| hal.deinit());
        self.registry.release(&[self.pins.clock, self.pins.data]);
        #[cfg(feature = "defmt")]
        defmt::debug!("I2C bus on {:?} deinitialized", self.pins);
    }

    fn check_lock(&self) -> Result<(), Error<H::Error>> {
        if self.lock.is_locked() {
            Ok(())
        } else {
            Err(Error::PermissionDenied)
        }
    }

    fn with_hal<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        self.hal.lock(|hal| f(&mut hal.borrow_mut()))
    }

    fn bus_error(&self, _address: u8, err: H::Error) -> Error<H::Error> {
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "I2C transfer with {=u8:#x} failed: {:?}",
            _address,
            defmt::Debug2Format(&err)
        );
        Error::Bus(err)
    }
}

impl<M: RawMutex, H: I2cHal> Drop for I2c<'_, M, H> {
    fn drop(&mut self) {
        self.deinit();
    }
}

fn check_address(address: u8) -> Result<(), ArgumentError> {
    if address > 0x7F {
        Err(ArgumentError::Address(address))
    } else {
        Ok(())
    }
}

/// Exclusive use of an [`I2c`] bus, released when dropped.
///
/// Implements the `embedded-hal` I2C trait so device drivers can run on a
/// shared bus.
pub struct I2cGuard<'a, 'r, M: RawMutex, H: I2cHal> {
    bus: &'a I2c<'r, M, H>,
}

impl<'r, M: RawMutex, H: I2cHal> Deref for I2cGuard<'_, 'r, M, H> {
    type Target = I2c<'r, M, H>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.bus
    }
}

impl<M: RawMutex, H: I2cHal> Drop for I2cGuard<'_, '_, M, H> {
    fn drop(&mut self) {
        self.bus.unlock();
    }
}

impl<M: RawMutex, H: I2cHal> hal1::ErrorType for I2cGuard<'_, '_, M, H>
where
    H::Error: hal1::Error,
{
    type Error = Error<H::Error>;
}

impl<M: RawMutex, H: I2cHal> hal1::I2c for I2cGuard<'_, '_, M, H>
where
    H::Error: hal1::Error,
{
    fn transaction(
        &mut self,
        address: hal1::SevenBitAddress,
        operations: &mut [hal1::Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.bus.check_lock()?;
        check_address(address)?;

        // Adjacent operations of one direction form a single transfer; the
        // only stop follows the final operation.
        let count = operations.len();
        self.bus
            .with_hal(|hal| -> Result<(), H::Error> {
                for i in 0..count {
                    let start = i == 0
                        || discriminant(&operations[i - 1])
                            != discriminant(&operations[i]);
                    let frame = Frame::new(start, i + 1 == count);
                    match &mut operations[i] {
                        hal1::Operation::Read(buffer) => {
                            hal.read_framed(address, buffer, frame)?
                        }
                        hal1::Operation::Write(buffer) => {
                            hal.write_framed(address, buffer, frame)?
                        }
                    }
                }
                Ok(())
            })
            .map_err(|e| self.bus.bus_error(address, e))
    }
}
