/// The four optical levels the panel hardware can drive directly.
///
/// Every pixel of the packed frame holds one of these as a 2-bit field.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Gray {
    White,
    LightGray,
    DarkGray,
    Black,
}

impl Gray {
    /// Gets a full byte with all four packed pixels set to this level
    pub fn get_byte_value(self) -> u8 {
        match self {
            Gray::White => 0xFF,
            Gray::LightGray => 0xAA,
            Gray::DarkGray => 0x55,
            Gray::Black => 0x00,
        }
    }

    /// Get the 2-bit field value of a single pixel at this level
    pub(crate) fn get_bit_value(self) -> u8 {
        match self {
            Gray::White => 0b11,
            Gray::LightGray => 0b10,
            Gray::DarkGray => 0b01,
            Gray::Black => 0b00,
        }
    }
}

/// Colors reachable on the panel through multi-pass waveforms.
///
/// The glass itself only shows the four [`Gray`] levels. The remaining
/// colors come out of repeated update passes under specific common- and
/// source-voltage settings, see
/// [`render_color`](crate::smallseg::SmallSeg::render_color).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    Black,
    White,
    Yellow,
    Green,
    Red,
    Blue,
}
