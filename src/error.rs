use core::fmt::{Debug, Display, Formatter};

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;

/// Epd error type
///
/// Wraps the errors of the underlying HAL resources and adds the failure
/// classes the device itself cannot report: the controller has no structured
/// error channel, so timeouts are detected observationally and bad
/// configuration is rejected before a transaction is issued.
pub enum ErrorKind<SPI, CS, BUSY, RST>
where
    SPI: SpiBus,
    CS: OutputPin,
    BUSY: InputPin,
    RST: OutputPin,
{
    /// Encountered an SPI error
    SpiError(SPI::Error),

    /// Encountered an error on the chip-select GPIO
    CsError(CS::Error),

    /// Encountered an error on the Busy GPIO
    BusyError(BUSY::Error),

    /// Encountered an error on the RST GPIO
    RstError(RST::Error),

    /// A busy or charge-pump-ready wait exceeded the configured bound.
    ///
    /// Recoverable: no partial buffer corruption, all frame and register
    /// writes are idempotent and can simply be retried.
    DeviceTimeout,

    /// A voltage or color argument was outside the documented device range.
    ///
    /// Rejected before anything is sent, an out-of-range value would
    /// otherwise silently truncate into a wrong register byte.
    InvalidConfiguration,

    /// An operation that talks to the panel was attempted before
    /// [`begin`](crate::smallseg::SmallSeg::begin)
    NotConfigured,
}

impl<SPI, CS, BUSY, RST> Debug for ErrorKind<SPI, CS, BUSY, RST>
where
    SPI: SpiBus,
    CS: OutputPin,
    BUSY: InputPin,
    RST: OutputPin,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SpiError(err) => write!(f, "SpiError({:?})", err),
            Self::CsError(err) => write!(f, "CsError({:?})", err),
            Self::BusyError(err) => write!(f, "BusyError({:?})", err),
            Self::RstError(err) => write!(f, "RstError({:?})", err),
            Self::DeviceTimeout => write!(f, "DeviceTimeout"),
            Self::InvalidConfiguration => write!(f, "InvalidConfiguration"),
            Self::NotConfigured => write!(f, "NotConfigured"),
        }
    }
}

impl<SPI, CS, BUSY, RST> Display for ErrorKind<SPI, CS, BUSY, RST>
where
    SPI: SpiBus,
    CS: OutputPin,
    BUSY: InputPin,
    RST: OutputPin,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SpiError(err) => write!(f, "SPI error: {:?}", err),
            Self::CsError(err) => write!(f, "chip-select pin error: {:?}", err),
            Self::BusyError(err) => write!(f, "busy pin error: {:?}", err),
            Self::RstError(err) => write!(f, "reset pin error: {:?}", err),
            Self::DeviceTimeout => write!(f, "device did not become ready in time"),
            Self::InvalidConfiguration => write!(f, "argument outside the device range"),
            Self::NotConfigured => write!(f, "driver used before begin()"),
        }
    }
}
