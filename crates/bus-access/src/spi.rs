use core::cell::RefCell;
use core::ops::Deref;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};
use embedded_hal::spi as hal1;

use crate::config::{SpiConfig, SpiSettings};
use crate::error::{ArgumentError, Error, PinError};
use crate::hal::SpiHal;
use crate::lock::{BusLock, LockState};
use crate::pins::{PinId, PinRegistry, PinRole, SpiPins};

/// Word clocked out on MOSI while reading.
pub const READ_FILL: u8 = 0x00;

/// Chunk size used to emulate in-place transfers on top of
/// [`SpiHal::transfer`].
const IN_PLACE_CHUNK: usize = 32;

/// HAL and the configuration it is currently running with. Kept under one
/// mutex so a configuration change never overlaps a transfer.
struct Inner<H> {
    hal: H,
    config: SpiConfig,
}

/// A shared SPI bus.
///
/// Only clock, MOSI and MISO are managed; chip select is left to the caller
/// because several devices share the same three lines.
pub struct Spi<'r, M: RawMutex, H: SpiHal> {
    inner: Mutex<M, RefCell<Inner<H>>>,
    lock: BusLock,
    registry: &'r PinRegistry,
    pins: SpiPins,
}

impl<'r, M: RawMutex, H: SpiHal> Spi<'r, M, H> {
    /// Claim `pins` in `registry` and bind `hal` to them.
    ///
    /// MOSI and MISO are each optional; a write-only or read-only bus is
    /// valid. The bus starts out with [`SpiConfig::default`].
    pub fn new(
        mut hal: H,
        registry: &'r PinRegistry,
        pins: SpiPins,
    ) -> Result<Self, Error<H::Error>> {
        let roles = pins.roles();
        for &(pin, role) in roles.iter() {
            if !hal.supports(pin, role) {
                return Err(PinError::Unsupported(pin, role).into());
            }
        }

        let claimed: heapless::Vec<_, 3> =
            roles.iter().map(|&(pin, _)| pin).collect();
        registry.claim(&claimed)?;

        if !hal.construct(pins) {
            registry.release(&claimed);
            #[cfg(feature = "defmt")]
            defmt::warn!("SPI peripheral refused pins {:?}", pins);
            return Err(PinError::Rejected.into());
        }

        Ok(Self {
            inner: Mutex::new(RefCell::new(Inner {
                hal,
                config: SpiConfig::default(),
            })),
            lock: BusLock::new(),
            registry,
            pins,
        })
    }

    /// Pins this bus was constructed on.
    pub fn pins(&self) -> SpiPins {
        self.pins
    }

    /// The configuration the bus is currently running with.
    pub fn config(&self) -> SpiConfig {
        self.inner.lock(|inner| inner.borrow().config)
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
    pub fn try_acquire(&self) -> Option<SpiGuard<'_, 'r, M, H>> {
        self.try_lock().then(|| SpiGuard { bus: self })
    }

    /// Change clock rate, mode and word width.
    ///
    /// Settings are validated before the HAL is called. If the HAL rejects
    /// them the previous configuration stays in effect.
    pub fn configure(
        &self,
        settings: SpiSettings,
    ) -> Result<(), Error<H::Error>> {
        self.check_lock()?;
        let config = settings.validate()?;

        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            match inner.hal.configure(&config) {
                Ok(()) => {
                    inner.config = config;
                    Ok(())
                }
                Err(err) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!(
                        "SPI configure {:?} failed: {:?}",
                        config,
                        defmt::Debug2Format(&err)
                    );
                    Err(Error::Configuration(err))
                }
            }
        })
    }

    /// Clock out all of `buffer`.
    pub fn write(&self, buffer: &[u8]) -> Result<(), Error<H::Error>> {
        self.check_lock()?;
        require_line(self.pins.mosi, PinRole::SpiMosi)?;

        self.with_hal(|hal| hal.write(buffer))
            .map_err(|e| self.bus_error(e))
    }

    /// Fill all of `buffer` from MISO while clocking out [`READ_FILL`].
    pub fn readinto(&self, buffer: &mut [u8]) -> Result<(), Error<H::Error>> {
        self.check_lock()?;
        require_line(self.pins.miso, PinRole::SpiMiso)?;

        self.with_hal(|hal| hal.read(buffer, READ_FILL))
            .map_err(|e| self.bus_error(e))
    }

    /// Clock out `write` while filling `read`. Both must be the same length.
    pub fn write_readinto(
        &self,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Error<H::Error>> {
        self.check_lock()?;
        require_line(self.pins.mosi, PinRole::SpiMosi)?;
        require_line(self.pins.miso, PinRole::SpiMiso)?;
        if write.len() != read.len() {
            return Err(ArgumentError::LengthMismatch {
                write: write.len(),
                read: read.len(),
            }
            .into());
        }

        self.with_hal(|hal| hal.transfer(write, read))
            .map_err(|e| self.bus_error(e))
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

        let pins: heapless::Vec<_, 3> =
            self.pins.roles().iter().map(|&(pin, _)| pin).collect();
        self.registry.release(&pins);
        #[cfg(feature = "defmt")]
        defmt::debug!("SPI bus on {:?} deinitialized", self.pins);
    }

    fn check_lock(&self) -> Result<(), Error<H::Error>> {
        if self.lock.is_locked() {
            Ok(())
        } else {
            Err(Error::PermissionDenied)
        }
    }

    fn with_hal<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        self.inner.lock(|inner| f(&mut inner.borrow_mut().hal))
    }

    fn bus_error(&self, err: H::Error) -> Error<H::Error> {
        #[cfg(feature = "defmt")]
        defmt::warn!("SPI transfer failed: {:?}", defmt::Debug2Format(&err));
        Error::Bus(err)
    }
}

impl<M: RawMutex, H: SpiHal> Drop for Spi<'_, M, H> {
    fn drop(&mut self) {
        self.deinit();
    }
}

fn require_line(
    line: Option<PinId>,
    role: PinRole,
) -> Result<(), ArgumentError> {
    match line {
        Some(_) => Ok(()),
        None => Err(ArgumentError::MissingLine(role)),
    }
}

/// Exclusive use of a [`Spi`] bus, released when dropped.
///
/// Implements the `embedded-hal` SPI bus trait, so it can back an
/// `embedded-hal-bus` device together with a chip-select pin.
pub struct SpiGuard<'a, 'r, M: RawMutex, H: SpiHal> {
    bus: &'a Spi<'r, M, H>,
}

impl<'r, M: RawMutex, H: SpiHal> Deref for SpiGuard<'_, 'r, M, H> {
    type Target = Spi<'r, M, H>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.bus
    }
}

impl<M: RawMutex, H: SpiHal> Drop for SpiGuard<'_, '_, M, H> {
    fn drop(&mut self) {
        self.bus.unlock();
    }
}

impl<M: RawMutex, H: SpiHal> hal1::ErrorType for SpiGuard<'_, '_, M, H>
where
    H::Error: hal1::Error,
{
    type Error = Error<H::Error>;
}

impl<M: RawMutex, H: SpiHal> hal1::SpiBus<u8> for SpiGuard<'_, '_, M, H>
where
    H::Error: hal1::Error,
{
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.readinto(words)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.bus.write(words)
    }

    fn transfer(
        &mut self,
        read: &mut [u8],
        write: &[u8],
    ) -> Result<(), Self::Error> {
        // Shorter side is padded with READ_FILL / discarded, per embedded-hal.
        let common = read.len().min(write.len());
        let (read_head, read_tail) = read.split_at_mut(common);
        let (write_head, write_tail) = write.split_at(common);

        if common > 0 {
            self.bus.write_readinto(write_head, read_head)?;
        }
        if !read_tail.is_empty() {
            self.bus.readinto(read_tail)?;
        }
        if !write_tail.is_empty() {
            self.bus.write(write_tail)?;
        }
        Ok(())
    }

    fn transfer_in_place(
        &mut self,
        words: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut out = [0u8; IN_PLACE_CHUNK];
        for chunk in words.chunks_mut(IN_PLACE_CHUNK) {
            let out = &mut out[..chunk.len()];
            out.copy_from_slice(chunk);
            self.bus.write_readinto(out, chunk)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
