//! A driver for the small segmented E-Paper Displays from Plastic Logic via SPI
//!
//! The panels are bistable and driven by the UC8156 controller IC. This
//! driver was built using [`embedded-hal`] traits.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal/~1
//!
//! # Requirements
//!
//! ### SPI
//!
//! - MISO only needed for register reads
//! - SPI_MODE_0 is used (CPHL = 0, CPOL = 0)
//! - 8 bits per word, MSB first
//! - Chip select is driven by this driver: the controller expects the
//!   register address as the first byte of every chip-select bracketed
//!   transaction and has no separate data/command pin
//!
//! ### Other....
//!
//! - A busy line is required; every transaction blocks until it clears,
//!   bounded by a configurable timeout
//! - The reset line is optional, without it a software reset is issued
//!
//! # Examples
//!
//! ```ignore
//! use pl_smallseg::prelude::*;
//!
//! let mut epd = SmallSeg::new(cs, busy, Some(rst), None);
//! epd.begin(&mut spi, &mut delay)?;
//!
//! // light the first three segments and render them red
//! epd.draw_segments(0b111, Gray::Black);
//! epd.render_color(&mut spi, &mut delay, Color::Red)?;
//! ```
#![no_std]

pub mod buffer;

pub mod color;

pub mod error;

mod traits;

/// Interface for the physical connection between display and the controlling device
mod interface;

pub mod smallseg;

pub mod prelude {
    pub use crate::color::{Color, Gray};
    pub use crate::error::ErrorKind;
    pub use crate::smallseg::{PowerMode, PowerState, SmallSeg, UpdateMode};
    pub use crate::SPI_MODE;
}

use embedded_hal::spi::{Mode, Phase, Polarity};

/// SPI mode -
/// For more infos see [Requirements: SPI](index.html#spi)
pub const SPI_MODE: Mode = Mode {
    phase: Phase::CaptureOnFirstTransition,
    polarity: Polarity::IdleLow,
};
