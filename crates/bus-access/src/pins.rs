//! Pin identities and run-time pin ownership.
//!
//! A [`PinRegistry`] is shared by every handle on a chip. Handles claim their
//! pins at construction and hand them back at deinit, so two peripherals can
//! never drive the same line.

use portable_atomic::{AtomicU64, Ordering};

use crate::error::PinError;

/// A physical pin, numbered the way the board support crate numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(u8);

impl PinId {
    /// The pin with chip-level number `number`.
    pub const fn new(number: u8) -> Self {
        Self(number)
    }

    /// Chip-level pin number.
    pub const fn number(self) -> u8 {
        self.0
    }
}

impl From<u8> for PinId {
    fn from(number: u8) -> Self {
        Self(number)
    }
}

/// The job a pin performs for a bus peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinRole {
    I2cClock,
    I2cData,
    SpiClock,
    SpiMosi,
    SpiMiso,
}

/// Clock and data lines of an I2C bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cPins {
    pub clock: PinId,
    pub data: PinId,
}

impl I2cPins {
    pub(crate) fn roles(&self) -> [(PinId, PinRole); 2] {
        [(self.clock, PinRole::I2cClock), (self.data, PinRole::I2cData)]
    }
}

/// Lines of an SPI bus. Either data line may be absent for a one-way bus.
///
/// Slave select is not part of the bus; callers drive it themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiPins {
    pub clock: PinId,
    pub mosi: Option<PinId>,
    pub miso: Option<PinId>,
}

impl SpiPins {
    pub(crate) fn roles(&self) -> heapless::Vec<(PinId, PinRole), 3> {
        [
            Some((self.clock, PinRole::SpiClock)),
            self.mosi.map(|pin| (pin, PinRole::SpiMosi)),
            self.miso.map(|pin| (pin, PinRole::SpiMiso)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Tracks which pins are currently bound to a peripheral.
///
/// Pins `0..64` are tracked in a single atomic word, so a claim of several
/// pins either takes all of them or none.
pub struct PinRegistry {
    claimed: AtomicU64,
}

impl PinRegistry {
    /// Highest pin number plus one that the registry can track.
    pub const CAPACITY: u8 = 64;

    /// A registry with no pins claimed.
    pub const fn new() -> Self {
        Self { claimed: AtomicU64::new(0) }
    }

    /// Whether `pin` is currently bound to some handle.
    pub fn is_claimed(&self, pin: PinId) -> bool {
        match Self::bit(pin) {
            Ok(bit) => self.claimed.load(Ordering::Acquire) & bit != 0,
            Err(_) => false,
        }
    }

    /// Claim all of `pins`, or none of them.
    pub fn claim(&self, pins: &[PinId]) -> Result<(), PinError> {
        let mut mask = 0u64;
        for &pin in pins {
            let bit = Self::bit(pin)?;
            if mask & bit != 0 {
                return Err(PinError::Duplicate(pin));
            }
            mask |= bit;
        }

        self.claimed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |claimed| {
                (claimed & mask == 0).then_some(claimed | mask)
            })
            .map(|_| ())
            .map_err(|claimed| {
                let taken = pins
                    .iter()
                    .copied()
                    .find(|&pin| Self::bit(pin).is_ok_and(|b| claimed & b != 0));
                match taken {
                    Some(pin) => PinError::InUse(pin),
                    None => PinError::Rejected,
                }
            })
    }

    /// Return `pins` to the pool. Pins that were not claimed are ignored.
    pub fn release(&self, pins: &[PinId]) {
        let mask = pins
            .iter()
            .filter_map(|&pin| Self::bit(pin).ok())
            .fold(0u64, |mask, bit| mask | bit);
        self.claimed.fetch_and(!mask, Ordering::AcqRel);
    }

    fn bit(pin: PinId) -> Result<u64, PinError> {
        if pin.number() < Self::CAPACITY {
            Ok(1u64 << pin.number())
        } else {
            Err(PinError::OutOfRange(pin))
        }
    }
}

impl Default for PinRegistry {
    fn default() -> Self {
        Self::new()
    }
}
