use embedded_hal::spi::{Mode, Phase, Polarity};

use crate::error::ArgumentError;

/// I2C bus configuration, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// SCL frequency in Hz.
    pub frequency: u32,
}

impl I2cConfig {
    pub const DEFAULT_FREQUENCY: u32 = 400_000;
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self { frequency: Self::DEFAULT_FREQUENCY }
    }
}

/// Requested SPI settings, as raw numbers.
///
/// These are checked by [`SpiSettings::validate`] before the HAL sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiSettings {
    /// Clock rate in Hz.
    pub baud_rate: u32,
    /// Idle clock level, 0 or 1.
    pub polarity: u8,
    /// Sampling edge, 0 for the first transition or 1 for the second.
    pub phase: u8,
    /// Word width, 8 or 9.
    pub bits: u8,
}

impl Default for SpiSettings {
    fn default() -> Self {
        Self { baud_rate: 100_000, polarity: 0, phase: 0, bits: 8 }
    }
}

impl SpiSettings {
    /// Check every field and convert to a [`SpiConfig`].
    pub fn validate(&self) -> Result<SpiConfig, ArgumentError> {
        let polarity = match self.polarity {
            0 => Polarity::IdleLow,
            1 => Polarity::IdleHigh,
            other => return Err(ArgumentError::Polarity(other)),
        };
        let phase = match self.phase {
            0 => Phase::CaptureOnFirstTransition,
            1 => Phase::CaptureOnSecondTransition,
            other => return Err(ArgumentError::Phase(other)),
        };
        if !matches!(self.bits, 8 | 9) {
            return Err(ArgumentError::Bits(self.bits));
        }

        Ok(SpiConfig {
            baud_rate: self.baud_rate,
            mode: Mode { polarity, phase },
            bits: self.bits,
        })
    }
}

/// A validated SPI configuration, as handed to [`SpiHal::configure`].
///
/// [`SpiHal::configure`]: crate::SpiHal::configure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    pub baud_rate: u32,
    pub mode: Mode,
    pub bits: u8,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            baud_rate: 100_000,
            mode: embedded_hal::spi::MODE_0,
            bits: 8,
        }
    }
}

impl SpiConfig {
    /// The raw settings that produce this configuration.
    pub fn settings(&self) -> SpiSettings {
        SpiSettings {
            baud_rate: self.baud_rate,
            polarity: match self.mode.polarity {
                Polarity::IdleLow => 0,
                Polarity::IdleHigh => 1,
            },
            phase: match self.mode.phase {
                Phase::CaptureOnFirstTransition => 0,
                Phase::CaptureOnSecondTransition => 1,
            },
            bits: self.bits,
        }
    }
}

impl From<SpiConfig> for SpiSettings {
    fn from(config: SpiConfig) -> Self {
        config.settings()
    }
}

impl TryFrom<SpiSettings> for SpiConfig {
    type Error = ArgumentError;

    fn try_from(settings: SpiSettings) -> Result<Self, Self::Error> {
        settings.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_agree() {
        assert_eq!(SpiSettings::default().validate(), Ok(SpiConfig::default()));
        assert_eq!(I2cConfig::default().frequency, 400_000);
    }

    #[test]
    fn out_of_range_fields_are_named() {
        let base = SpiSettings::default();
        assert_eq!(
            SpiSettings { polarity: 2, ..base }.validate(),
            Err(ArgumentError::Polarity(2))
        );
        assert_eq!(
            SpiSettings { phase: 7, ..base }.validate(),
            Err(ArgumentError::Phase(7))
        );
        assert_eq!(
            SpiSettings { bits: 10, ..base }.validate(),
            Err(ArgumentError::Bits(10))
        );
    }

    #[test]
    fn mode_3_at_nine_bits() {
        let settings =
            SpiSettings { baud_rate: 1_000_000, polarity: 1, phase: 1, bits: 9 };
        let config = settings.validate().unwrap();
        assert_eq!(config.mode, embedded_hal::spi::MODE_3);
        assert_eq!(config.settings(), settings);
    }
}
